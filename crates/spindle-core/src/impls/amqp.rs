//! AmqpBroker - RabbitMQ（AMQP 0-9-1）への送信
//!
//! # 配送保証
//! - `delivery_mode = 2`（persistent）: ブローカー再起動後もメッセージが残る
//! - publisher confirms を有効にし、ack を受け取るまで publish を完了させない
//! - nack は PublishError::Rejected、キューに届かず戻された場合は PublishError::Unroutable
//! - connect と confirm 待ちにはそれぞれ上限時間がある
//!
//! # キューは作らない
//! 接続時に passive な queue_declare で存在だけ確認します。
//! passive 宣言はキューを作らず、プロパティの比較もしません。

use std::time::Duration;

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, info};

use crate::config::BrokerConfig;
use crate::ports::{Broker, BrokerError, Connector, DeliveryMode, OutboundMessage, PublishError};

const REPLY_SUCCESS: u16 = 200;

fn amqp_delivery_mode(mode: DeliveryMode) -> u8 {
    match mode {
        DeliveryMode::Transient => 1,
        DeliveryMode::Persistent => 2,
    }
}

/// AmqpConnector は設定からコネクションとチャネルを開く
pub struct AmqpConnector {
    config: BrokerConfig,
    queue: String,
}

impl AmqpConnector {
    pub fn new(config: BrokerConfig, queue: impl Into<String>) -> Self {
        Self {
            config,
            queue: queue.into(),
        }
    }
}

impl AmqpConnector {
    async fn open(&self) -> Result<AmqpBroker, BrokerError> {
        let endpoint = self.config.endpoint();
        let connect_err = |e: lapin::Error| BrokerError::Connect {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        };

        let connection =
            Connection::connect(&self.config.amqp_uri(), ConnectionProperties::default())
                .await
                .map_err(connect_err)?;
        let channel = connection.create_channel().await.map_err(connect_err)?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(connect_err)?;

        let passive = QueueDeclareOptions {
            passive: true,
            ..QueueDeclareOptions::default()
        };
        if let Err(e) = channel
            .queue_declare(&self.queue, passive, FieldTable::default())
            .await
        {
            debug!(error = %e, queue = %self.queue, "passive declare failed");
            // チャネルはサーバ側で閉じられているので、コネクションだけ片付ける
            let _ = connection.close(REPLY_SUCCESS, "target missing").await;
            return Err(BrokerError::MissingTarget(self.queue.clone()));
        }

        info!(endpoint = %endpoint, queue = %self.queue, "connected to broker");
        Ok(AmqpBroker {
            connection,
            channel,
            confirm_timeout: self.config.confirm_timeout,
        })
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    type Broker = AmqpBroker;

    /// 応答しないブローカーでも connect_timeout で諦める
    async fn connect(&self) -> Result<AmqpBroker, BrokerError> {
        match tokio::time::timeout(self.config.connect_timeout, self.open()).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::Connect {
                endpoint: self.config.endpoint(),
                reason: format!(
                    "no handshake within {}ms",
                    self.config.connect_timeout.as_millis()
                ),
            }),
        }
    }
}

/// AmqpBroker は確認モードのチャネル 1 本で送信する
pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
    confirm_timeout: Duration,
}

/// confirm を送信結果に変換する
///
/// mandatory で送っているので、キューに届かなかったメッセージは
/// ack と一緒に basic.return で戻ってくる（ack だけ見ると成功に見える）
fn settle(nacked: bool, returned: Option<(u16, String)>) -> Result<(), PublishError> {
    if let Some((reply_code, reply_text)) = returned {
        return Err(PublishError::Unroutable {
            reply_code,
            reply_text,
        });
    }
    if nacked {
        return Err(PublishError::Rejected);
    }
    Ok(())
}

fn confirmation_result(confirm: Confirmation) -> Result<(), PublishError> {
    let nacked = matches!(confirm, Confirmation::Nack(_));
    let returned = match confirm {
        Confirmation::Ack(returned) | Confirmation::Nack(returned) => {
            returned.map(|m| (m.reply_code, m.reply_text.as_str().to_string()))
        }
        Confirmation::NotRequested => None,
    };
    settle(nacked, returned)
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError> {
        let properties = BasicProperties::default()
            .with_delivery_mode(amqp_delivery_mode(message.delivery))
            .with_content_type(ShortString::from(message.content_type))
            .with_message_id(ShortString::from(message.key.clone()))
            .with_priority(message.priority);
        let options = BasicPublishOptions {
            mandatory: true,
            ..BasicPublishOptions::default()
        };

        let pending = self
            .channel
            .basic_publish("", &message.target, options, &message.body, properties)
            .await
            .map_err(|e| PublishError::Send(e.to_string()))?;

        let confirm = tokio::time::timeout(self.confirm_timeout, pending)
            .await
            .map_err(|_| PublishError::Unconfirmed(self.confirm_timeout))?
            .map_err(|e| PublishError::Send(e.to_string()))?;

        confirmation_result(confirm)
    }

    async fn close(&self) -> Result<(), BrokerError> {
        // 未確認の publish はないはず（publish は確認まで待つ）なので、そのまま閉じる
        self.channel
            .close(REPLY_SUCCESS, "producer done")
            .await
            .map_err(|e| BrokerError::Close(e.to_string()))?;
        self.connection
            .close(REPLY_SUCCESS, "producer done")
            .await
            .map_err(|e| BrokerError::Close(e.to_string()))?;
        info!("broker connection closed");
        Ok(())
    }
}
