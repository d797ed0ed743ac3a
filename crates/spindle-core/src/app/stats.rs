//! StatsClient - publish 後に外部の統計エンドポイントを覗く
//!
//! 表示専用です。どんな失敗も warning に落とし、publish 実行の結果は変えません。

use serde_json::Value;
use thiserror::Error;

use crate::config::StatsConfig;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("stats request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("stats endpoint answered {0}")]
    Status(reqwest::StatusCode),

    #[error("stats body is not JSON: {0}")]
    Decode(#[source] reqwest::Error),
}

pub struct StatsClient {
    client: reqwest::Client,
    url: String,
}

impl StatsClient {
    pub fn new(config: &StatsConfig) -> Result<Self, StatsError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(StatsError::Request)?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Value, StatsError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(StatsError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatsError::Status(status));
        }
        response.json::<Value>().await.map_err(StatsError::Decode)
    }
}

/// コンソール表示用に整形
pub fn render(stats: &Value) -> String {
    serde_json::to_string_pretty(stats).unwrap_or_else(|_| stats.to_string())
}
