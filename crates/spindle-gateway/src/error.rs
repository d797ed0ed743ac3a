use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// 起動時のエラー。リクエスト単位の拒否はエラーではなく 403/404 になる
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("asset root {path} is not accessible: {source}")]
    AssetRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("asset root {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
