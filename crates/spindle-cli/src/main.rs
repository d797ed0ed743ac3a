//! spindle - task producer + dashboard gateway
//!
//! - `spindle seed`    : サンプル 18 件を publish（type ごとにまとめて送信）
//! - `spindle publish` : 1 件だけ publish
//! - `spindle serve`   : dashboard の静的ファイルを配信
//!
//! 終了コード: 0 成功 / 1 致命的エラー・送信失敗あり / 130 中断

mod args;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use spindle_core::app::stats::render;
use spindle_core::app::{
    BatchReport, SeedError, SeedSummary, StatsOutcome, run_seed, sample_catalog, shutdown,
};
use spindle_core::config::ProducerConfig;
use spindle_core::domain::{MaxRetries, Priority, TaskDraft, TaskId, TaskType, payload_from_json};
use spindle_core::impls::AmqpConnector;
use spindle_core::observability::init_tracing;
use spindle_core::ports::{IdGenerator, SystemClock, UlidGenerator};
use spindle_gateway::Gateway;

use crate::args::{Cli, Command, PublishArgs, SeedArgs, ServeArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failed,
    Interrupted,
}

impl Outcome {
    fn from_report(report: &BatchReport) -> Self {
        if report.interrupted {
            Outcome::Interrupted
        } else if report.is_success() {
            Outcome::Success
        } else {
            Outcome::Failed
        }
    }

    fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
            Outcome::Interrupted => ExitCode::from(130),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing("info");

    let result = match cli.command {
        Command::Seed(args) => seed(args).await,
        Command::Publish(args) => publish(args).await,
        Command::Serve(args) => serve(args).await,
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn seed(args: SeedArgs) -> Result<Outcome> {
    let config = args.producer_config();
    let drafts = sample_catalog().context("sample catalog is invalid")?;
    run(&config, drafts).await
}

async fn publish(args: PublishArgs) -> Result<Outcome> {
    let id = match &args.id {
        Some(id) => TaskId::new(id.as_str()).context("invalid --id")?,
        None => UlidGenerator::new(SystemClock).generate_task_id(),
    };
    let payload = payload_from_json(&args.payload).context("invalid --payload")?;
    let draft = TaskDraft::new(id, TaskType::from(args.task_type.as_str()), payload)
        .with_priority(Priority::new(args.priority).context("invalid --priority")?)
        .with_max_retries(MaxRetries::new(args.max_retries).context("invalid --max-retries")?)
        .with_delay(Duration::from_secs(args.delay_secs));

    let config = args.producer_config();
    run(&config, vec![draft]).await
}

async fn run(config: &ProducerConfig, drafts: Vec<TaskDraft>) -> Result<Outcome> {
    let connector = AmqpConnector::new(config.broker.clone(), config.queue.clone());
    let (tx, rx) = shutdown::channel();
    let listener = tokio::spawn(forward_interrupt(tx));

    let summary = run_seed(config, &connector, SystemClock, drafts, rx).await;
    listener.abort();

    let summary = match summary {
        Err(SeedError::Interrupted) => {
            println!("interrupted before the broker connection was ready; nothing was sent");
            return Ok(Outcome::Interrupted);
        }
        other => other.with_context(|| {
            format!(
                "could not publish to {} (queue {:?})",
                config.broker.endpoint(),
                config.queue
            )
        })?,
    };
    print_summary(&summary);
    Ok(Outcome::from_report(&summary.report))
}

async fn serve(args: ServeArgs) -> Result<Outcome> {
    let config = args.gateway_config();
    let gateway = Gateway::new(&config).context("could not prepare asset root")?;
    let listener = gateway.bind().await.context("could not start gateway")?;

    gateway
        .serve(listener, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, draining connections");
            }
        })
        .await
        .context("gateway stopped with an error")?;
    Ok(Outcome::Success)
}

/// Ctrl-C を停止フラグに変換する。送信中の publish は止めない
async fn forward_interrupt(tx: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, stopping after the current send");
        let _ = tx.send(true);
    }
}

fn print_summary(summary: &SeedSummary) {
    let report = &summary.report;
    for envelope in &report.sent {
        println!("sent  {} ({})", envelope.id(), envelope.task_type());
    }
    for failure in &report.failed {
        println!(
            "FAIL  {} ({}): {}",
            failure.task_id, failure.task_type, failure.error
        );
    }
    println!(
        "sent={} failed={} skipped={}{}",
        report.sent.len(),
        report.failed.len(),
        report.skipped,
        if report.interrupted { " (interrupted)" } else { "" }
    );

    match &summary.stats {
        StatsOutcome::Fetched(stats) => println!("stats:\n{}", render(stats)),
        StatsOutcome::Unavailable(reason) => println!("stats unavailable: {reason}"),
        StatsOutcome::Skipped | StatsOutcome::Disabled => {}
    }
}
