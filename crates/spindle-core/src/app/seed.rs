//! Seed run - 接続 → 一括送信 → 切断 → （任意）stats 表示
//!
//! # エラー分類
//! - 接続失敗: 致命的。1 通も送らずに SeedError を返す
//! - 接続中の停止要求: 接続を諦めて SeedError::Interrupted（1 通も送らない）
//! - 1 件の送信失敗: BatchReport に記録（SendFailurePolicy 次第で続行）
//! - 切断失敗: warning（送信結果は確定済み）
//! - stats 失敗: warning。実行結果は成功のまま

use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use super::producer::{BatchReport, Producer};
use super::shutdown;
use super::stats::StatsClient;
use crate::config::{ProducerConfig, StatsConfig};
use crate::domain::TaskDraft;
use crate::ports::{BrokerError, Clock, Connector};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("interrupted while connecting to the broker")]
    Interrupted,
}

/// stats 取得の結果（どれでも実行は成功扱い）
#[derive(Debug, Clone, PartialEq)]
pub enum StatsOutcome {
    Disabled,
    Skipped,
    Fetched(Value),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedSummary {
    pub report: BatchReport,
    pub stats: StatsOutcome,
}

pub async fn run_seed<K, C>(
    config: &ProducerConfig,
    connector: &K,
    clock: C,
    drafts: Vec<TaskDraft>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<SeedSummary, SeedError>
where
    K: Connector,
    C: Clock,
{
    let mut connect_rx = shutdown_rx.clone();
    let broker = tokio::select! {
        // 接続がすぐ終わるなら停止要求より優先（切断まで含めて通常の経路で片付く）
        biased;
        connected = connector.connect() => connected?,
        _ = shutdown::requested(&mut connect_rx) => {
            warn!("shutdown requested while connecting, nothing was sent");
            return Err(SeedError::Interrupted);
        }
    };
    let producer = Producer::new(broker, clock, config.queue.clone())
        .with_pacing(config.pacing)
        .with_send_failure_policy(config.on_send_failure);

    let report = producer.publish_batch(drafts, shutdown_rx.clone()).await;

    // 送信結果は確定済みなので、切断の失敗は warning に留める
    if let Err(e) = producer.close().await {
        warn!(error = %e, "broker connection did not close cleanly");
    }

    info!(
        sent = report.sent.len(),
        failed = report.failed.len(),
        skipped = report.skipped,
        "publish run finished"
    );

    let stats = match &config.stats {
        None => StatsOutcome::Disabled,
        Some(_) if report.interrupted => StatsOutcome::Skipped,
        Some(stats_config) => fetch_stats(stats_config, shutdown_rx).await,
    };

    Ok(SeedSummary { report, stats })
}

async fn fetch_stats(config: &StatsConfig, mut shutdown_rx: watch::Receiver<bool>) -> StatsOutcome {
    if !config.settle_delay.is_zero() {
        info!(delay_ms = config.settle_delay.as_millis() as u64, "waiting for tasks to be processed");
        tokio::select! {
            _ = tokio::time::sleep(config.settle_delay) => {}
            _ = shutdown::requested(&mut shutdown_rx) => return StatsOutcome::Skipped,
        }
    }

    let client = match StatsClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "could not build stats client");
            return StatsOutcome::Unavailable(e.to_string());
        }
    };

    match client.fetch().await {
        Ok(stats) => StatsOutcome::Fetched(stats),
        Err(e) => {
            warn!(url = %client.url(), error = %e, "could not fetch stats");
            StatsOutcome::Unavailable(e.to_string())
        }
    }
}
