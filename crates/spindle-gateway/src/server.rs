//! HTTP サーバ（axum）
//!
//! GET のみ。配信判断は [`RuleChain`] に委ね、ここではレスポンスへの変換だけを行う。

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::assets::{AssetRoot, content_type_for};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::rules::{Denial, Resolution, RuleChain};

#[derive(Clone)]
struct GatewayState {
    chain: Arc<RuleChain>,
}

/// 起動済みの設定 + ルールチェーン
#[derive(Debug)]
pub struct Gateway {
    listen_addr: std::net::SocketAddr,
    request_timeout: Duration,
    chain: Arc<RuleChain>,
}

impl Gateway {
    /// asset root を canonicalize して標準のルールチェーンを組み立てる
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let root = AssetRoot::open(&config.asset_root)?;
        info!(
            root = %root.path().display(),
            reserved = ?config.reserved_segment.clone().or_else(|| root.dir_name()),
            "asset root ready"
        );
        let chain = RuleChain::standard(
            root,
            config.reserved_segment.clone(),
            config.index_document.clone(),
        );
        Ok(Self {
            listen_addr: config.listen_addr,
            request_timeout: config.request_timeout,
            chain: Arc::new(chain),
        })
    }

    pub fn router(&self) -> Router {
        build_router(
            GatewayState {
                chain: Arc::clone(&self.chain),
            },
            self.request_timeout,
        )
    }

    pub async fn bind(&self) -> Result<TcpListener, GatewayError> {
        TcpListener::bind(self.listen_addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: self.listen_addr,
                source,
            })
    }

    /// shutdown が来るまで配信する
    ///
    /// shutdown 後は処理中の接続を待つが、request_timeout を過ぎたら残りを置いて戻る
    /// （ヘッダを送りきらない接続で停止が止まらないように）
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "gateway listening");
        }

        let (stopping_tx, mut stopping_rx) = watch::channel(false);
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = stopping_tx.send(true);
            })
            .into_future();

        let drain_limit = self.request_timeout;
        let drain_deadline = async move {
            let stopping = stopping_rx.wait_for(|stopping| *stopping).await.is_ok();
            if !stopping {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(drain_limit).await;
        };

        tokio::select! {
            result = server => result?,
            _ = drain_deadline => {
                warn!(
                    limit_ms = drain_limit.as_millis() as u64,
                    "connections still open after shutdown, stopping anyway"
                );
            }
        }
        info!("gateway stopped");
        Ok(())
    }
}

fn build_router(state: GatewayState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(serve_asset))
        .route("/{*path}", get(serve_asset))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_asset(State(state): State<GatewayState>, uri: Uri) -> Response {
    match state.chain.evaluate(uri.path()).await {
        Resolution::Serve(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => {
                ([(header::CONTENT_TYPE, content_type_for(&path))], bytes).into_response()
            }
            Err(err) => {
                // 評価後に消えた
                warn!(path = %path.display(), error = %err, "failed to read asset");
                denial_response(Denial::NotFound)
            }
        },
        Resolution::Deny { rule, denial } => {
            debug!(rule, path = uri.path(), ?denial, "request denied");
            denial_response(denial)
        }
    }
}

fn denial_response(denial: Denial) -> Response {
    match denial {
        Denial::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Denial::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
    }
}
