//! Gateway configuration (immutable after startup).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_ASSET_ROOT: &str = "dashboard";
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    pub asset_root: PathBuf,
    /// None なら asset root 自身のディレクトリ名
    pub reserved_segment: Option<String>,
    pub index_document: String,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(asset_root: impl Into<PathBuf>, listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            asset_root: asset_root.into(),
            reserved_segment: None,
            index_document: DEFAULT_INDEX_DOCUMENT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let addr = DEFAULT_LISTEN_ADDR
            .parse()
            .unwrap_or(SocketAddr::from(([0, 0, 0, 0], 8000)));
        Self::new(DEFAULT_ASSET_ROOT, addr)
    }
}
