//! コマンドライン引数（clap derive）と不変 config への変換

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use spindle_core::app::{Pacing, SendFailurePolicy};
use spindle_core::config::{
    BrokerConfig, DEFAULT_QUEUE, DEFAULT_STATS_URL, ProducerConfig, StatsConfig,
    DEFAULT_STATS_TIMEOUT,
};
use spindle_gateway::GatewayConfig;
use spindle_gateway::config::{DEFAULT_ASSET_ROOT, DEFAULT_INDEX_DOCUMENT, DEFAULT_LISTEN_ADDR};

#[derive(Parser, Debug)]
#[command(
    name = "spindle",
    version,
    about = "Publish task envelopes to the execution queue and serve the dashboard"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish the built-in sample catalog (18 tasks, 6 types)
    Seed(SeedArgs),
    /// Publish a single task
    Publish(PublishArgs),
    /// Serve the dashboard assets over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BrokerArgs {
    #[arg(long = "amqp-host", env = "SPINDLE_AMQP_HOST", default_value = "localhost")]
    pub host: String,

    #[arg(long = "amqp-port", env = "SPINDLE_AMQP_PORT", default_value_t = 5672)]
    pub port: u16,

    #[arg(long = "amqp-user", env = "SPINDLE_AMQP_USER", default_value = "guest")]
    pub user: String,

    #[arg(
        long = "amqp-password",
        env = "SPINDLE_AMQP_PASSWORD",
        default_value = "guest",
        hide_env_values = true
    )]
    pub password: String,

    #[arg(long = "amqp-vhost", env = "SPINDLE_AMQP_VHOST", default_value = "/")]
    pub vhost: String,

    /// Target queue (must already exist)
    #[arg(long, env = "SPINDLE_QUEUE", default_value = DEFAULT_QUEUE)]
    pub queue: String,
}

impl BrokerArgs {
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.password.clone(),
            vhost: self.vhost.clone(),
            ..BrokerConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicyArg {
    Continue,
    Abort,
}

impl From<FailurePolicyArg> for SendFailurePolicy {
    fn from(value: FailurePolicyArg) -> Self {
        match value {
            FailurePolicyArg::Continue => SendFailurePolicy::Continue,
            FailurePolicyArg::Abort => SendFailurePolicy::Abort,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// Delay between sends in milliseconds (0 disables pacing)
    #[arg(long, default_value_t = 300)]
    pub pacing_ms: u64,

    /// What to do when a single publish fails
    #[arg(long, value_enum, default_value = "continue")]
    pub on_send_failure: FailurePolicyArg,

    #[arg(long, env = "SPINDLE_STATS_URL", default_value = DEFAULT_STATS_URL)]
    pub stats_url: String,

    /// Seconds to wait before querying stats
    #[arg(long, default_value_t = 5)]
    pub stats_settle_secs: u64,

    /// Skip the stats query
    #[arg(long)]
    pub no_stats: bool,
}

impl SeedArgs {
    pub fn producer_config(&self) -> ProducerConfig {
        let stats = (!self.no_stats).then(|| StatsConfig {
            url: self.stats_url.clone(),
            settle_delay: Duration::from_secs(self.stats_settle_secs),
            timeout: DEFAULT_STATS_TIMEOUT,
        });
        ProducerConfig {
            broker: self.broker.broker_config(),
            queue: self.broker.queue.clone(),
            pacing: Pacing::from_millis(self.pacing_ms),
            on_send_failure: self.on_send_failure.into(),
            stats,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// Task type (email, notification, report, backup, cleanup, generic, or any other name)
    #[arg(long = "type")]
    pub task_type: String,

    /// JSON object payload
    #[arg(long, default_value = "{}")]
    pub payload: String,

    /// Task id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// 1 (lowest) .. 5 (highest)
    #[arg(long, default_value_t = 3)]
    pub priority: u8,

    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Schedule the task this many seconds in the future
    #[arg(long, default_value_t = 0)]
    pub delay_secs: u64,
}

impl PublishArgs {
    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            broker: self.broker.broker_config(),
            queue: self.broker.queue.clone(),
            pacing: Pacing::None,
            on_send_failure: SendFailurePolicy::Continue,
            stats: None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "SPINDLE_ASSET_ROOT", default_value = DEFAULT_ASSET_ROOT)]
    pub asset_root: PathBuf,

    #[arg(long, env = "SPINDLE_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Leading path segment that is always 404 (defaults to the asset root's directory name)
    #[arg(long)]
    pub reserved_prefix: Option<String>,

    #[arg(long, default_value = DEFAULT_INDEX_DOCUMENT)]
    pub index_document: String,

    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,
}

impl ServeArgs {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            listen_addr: self.listen_addr,
            asset_root: self.asset_root.clone(),
            reserved_segment: self.reserved_prefix.clone(),
            index_document: self.index_document.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
