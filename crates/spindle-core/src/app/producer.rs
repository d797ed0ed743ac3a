//! Producer - envelope を組み立てて永続モードでキューに送る
//!
//! # フロー（publish 1 件）
//! 1. Clock から現在時刻を取り、TaskDraft を TaskEnvelope に確定
//! 2. JSON にシリアライズ
//! 3. Broker::publish（persistent, key = task id）で受領確認まで待つ
//!
//! # フロー（publish_batch）
//! 1. type ごとにまとめる（最初に現れた順）
//! 2. グループごとに連続して送る。送信と送信の間に Pacing を挟む
//! 3. 1 件の失敗は記録し、SendFailurePolicy に従って続行 or 中断
//! 4. 停止要求は「次の送信の前」に確認する（送信中の publish は中断しない）

use tokio::sync::watch;
use tracing::{error, info, warn};

use super::batch::group_by_type;
use super::pacing::Pacing;
use super::shutdown;
use crate::domain::{
    MaxRetries, Payload, Priority, TaskDraft, TaskEnvelope, TaskId, TaskType,
};
use crate::ports::{Broker, BrokerError, Clock, DeliveryMode, OutboundMessage, PublishError};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// 1 件の送信失敗をどう扱うか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendFailurePolicy {
    /// 記録して残りを送り続ける
    #[default]
    Continue,
    /// 記録して残りを送らない
    Abort,
}

/// 送信に失敗したタスク
#[derive(Debug, Clone, PartialEq)]
pub struct SendFailure {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub error: String,
}

/// publish_batch の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// 送信順
    pub sent: Vec<TaskEnvelope>,
    pub failed: Vec<SendFailure>,
    /// 中断・停止要求で送らなかった件数
    pub skipped: usize,
    pub interrupted: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0 && !self.interrupted
    }

    pub fn attempted(&self) -> usize {
        self.sent.len() + self.failed.len()
    }
}

/// Producer は一発送信するだけの書き手
///
/// # 使用例
/// ```ignore
/// let producer = Producer::new(broker, SystemClock, "task-execution-queue")
///     .with_pacing(Pacing::Fixed(Duration::from_millis(300)));
/// let report = producer.publish_batch(drafts, shutdown_rx).await;
/// producer.close().await?;
/// ```
pub struct Producer<B, C> {
    broker: B,
    clock: C,
    queue: String,
    pacing: Pacing,
    on_send_failure: SendFailurePolicy,
}

impl<B: Broker, C: Clock> Producer<B, C> {
    pub fn new(broker: B, clock: C, queue: impl Into<String>) -> Self {
        Self {
            broker,
            clock,
            queue: queue.into(),
            pacing: Pacing::None,
            on_send_failure: SendFailurePolicy::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_send_failure_policy(mut self, policy: SendFailurePolicy) -> Self {
        self.on_send_failure = policy;
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// 1 件を永続モードで送る
    pub async fn publish(&self, draft: TaskDraft) -> Result<TaskEnvelope, PublishError> {
        let envelope = TaskEnvelope::seal(draft, self.clock.now());
        let message = OutboundMessage {
            target: self.queue.clone(),
            key: envelope.id().to_string(),
            body: envelope.to_json_bytes()?,
            content_type: CONTENT_TYPE_JSON,
            delivery: DeliveryMode::Persistent,
            priority: envelope.priority().get(),
        };

        self.broker.publish(message).await?;
        info!(
            task_id = %envelope.id(),
            task_type = %envelope.task_type(),
            priority = envelope.priority().get(),
            "sent task"
        );
        Ok(envelope)
    }

    /// id / type / payload だけで送る（priority と maxRetries は既定値）
    pub async fn publish_task(
        &self,
        task_id: TaskId,
        task_type: TaskType,
        payload: Payload,
    ) -> Result<TaskEnvelope, PublishError> {
        let draft = TaskDraft::new(task_id, task_type, payload)
            .with_priority(Priority::DEFAULT)
            .with_max_retries(MaxRetries::DEFAULT);
        self.publish(draft).await
    }

    /// type ごとのまとまりで順番に送る
    pub async fn publish_batch(
        &self,
        drafts: Vec<TaskDraft>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> BatchReport {
        let total = drafts.len();
        let groups = group_by_type(drafts);
        let mut report = BatchReport::default();
        let mut first_send = true;

        'groups: for (index, group) in groups.into_iter().enumerate() {
            info!(
                group = index + 1,
                task_type = %group.task_type,
                count = group.drafts.len(),
                "sending task group"
            );

            for draft in group.drafts {
                if !first_send {
                    tokio::select! {
                        _ = self.pacing.pause() => {}
                        _ = shutdown::requested(&mut shutdown_rx) => {}
                    }
                }
                if shutdown::is_requested(&shutdown_rx) {
                    warn!("shutdown requested, stopping before next send");
                    report.interrupted = true;
                    break 'groups;
                }
                first_send = false;

                let task_id = draft.id.clone();
                let task_type = draft.task_type.clone();
                match self.publish(draft).await {
                    Ok(envelope) => report.sent.push(envelope),
                    Err(e) => {
                        error!(task_id = %task_id, task_type = %task_type, error = %e, "failed to publish task");
                        report.failed.push(SendFailure {
                            task_id,
                            task_type,
                            error: e.to_string(),
                        });
                        if self.on_send_failure == SendFailurePolicy::Abort {
                            warn!("send failure policy is abort, skipping remaining tasks");
                            break 'groups;
                        }
                    }
                }
            }
        }

        report.skipped = total - report.attempted();
        report
    }

    /// ブローカー接続を閉じる
    pub async fn close(self) -> Result<(), BrokerError> {
        self.broker.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payload_from_json;
    use crate::impls::InMemoryBroker;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::time::Duration;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap())
    }

    fn draft(id: &str, task_type: &str) -> TaskDraft {
        TaskDraft::new(
            TaskId::new(id).unwrap(),
            TaskType::from(task_type),
            payload_from_json(r#"{"k":"v"}"#).unwrap(),
        )
    }

    fn keys(broker: &InMemoryBroker) -> Vec<String> {
        broker.published().into_iter().map(|m| m.key).collect()
    }

    #[tokio::test]
    async fn publish_sends_persistent_keyed_message() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.clone(), clock(), "task-execution-queue");

        let envelope = producer
            .publish(draft("email-001", "email").with_priority(Priority::new(5).unwrap()))
            .await
            .unwrap();

        let published = broker.published();
        assert_eq!(published.len(), 1);
        let msg = &published[0];
        assert_eq!(msg.target, "task-execution-queue");
        assert_eq!(msg.key, "email-001");
        assert_eq!(msg.delivery, DeliveryMode::Persistent);
        assert_eq!(msg.content_type, "application/json");
        assert_eq!(msg.priority, 5);

        let decoded: TaskEnvelope = serde_json::from_slice(&msg.body).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.retry_count(), 0);
    }

    #[tokio::test]
    async fn publish_task_uses_default_budget() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.clone(), clock(), "q");

        let envelope = producer
            .publish_task(
                TaskId::new("generic-001").unwrap(),
                TaskType::Generic,
                Payload::new(),
            )
            .await
            .unwrap();

        assert_eq!(envelope.priority(), Priority::DEFAULT);
        assert_eq!(envelope.max_retries(), MaxRetries::DEFAULT);
        assert_eq!(keys(&broker), vec!["generic-001"]);
    }

    #[tokio::test]
    async fn batch_is_grouped_by_type_in_iteration_order() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.clone(), clock(), "q");
        let (_tx, rx) = shutdown::channel();

        let report = producer
            .publish_batch(
                vec![
                    draft("e1", "email"),
                    draft("b1", "backup"),
                    draft("e2", "email"),
                    draft("b2", "backup"),
                    draft("c1", "cleanup"),
                ],
                rx,
            )
            .await;

        assert!(report.is_success());
        assert_eq!(keys(&broker), vec!["e1", "e2", "b1", "b2", "c1"]);
        assert!(broker
            .published()
            .iter()
            .all(|m| m.delivery == DeliveryMode::Persistent));
    }

    #[rstest]
    #[case::continue_on_failure(SendFailurePolicy::Continue, vec!["e1", "e3", "r1"], 0)]
    #[case::abort_on_failure(SendFailurePolicy::Abort, vec!["e1"], 2)]
    #[tokio::test]
    async fn send_failure_policy_decides_remaining_sends(
        #[case] policy: SendFailurePolicy,
        #[case] expected_sent: Vec<&str>,
        #[case] expected_skipped: usize,
    ) {
        let broker = InMemoryBroker::new();
        broker.reject_key("e2");
        let producer =
            Producer::new(broker.clone(), clock(), "q").with_send_failure_policy(policy);
        let (_tx, rx) = shutdown::channel();

        let report = producer
            .publish_batch(
                vec![
                    draft("e1", "email"),
                    draft("e2", "email"),
                    draft("e3", "email"),
                    draft("r1", "report"),
                ],
                rx,
            )
            .await;

        assert_eq!(keys(&broker), expected_sent);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].task_id.as_str(), "e2");
        assert_eq!(report.skipped, expected_skipped);
        assert!(!report.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_is_applied_between_sends_only() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.clone(), clock(), "q")
            .with_pacing(Pacing::Fixed(Duration::from_millis(300)));
        let (_tx, rx) = shutdown::channel();

        let start = tokio::time::Instant::now();
        producer
            .publish_batch(
                vec![draft("a", "email"), draft("b", "email"), draft("c", "report")],
                rx,
            )
            .await;

        // 3 件 → 間は 2 回
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(600));
        assert!(elapsed < Duration::from_millis(900));
        assert_eq!(broker.published().len(), 3);
    }

    #[tokio::test]
    async fn shutdown_request_stops_before_next_send() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.clone(), clock(), "q");
        let (tx, rx) = shutdown::channel();
        tx.send(true).unwrap();

        let report = producer
            .publish_batch(vec![draft("a", "email"), draft("b", "email")], rx)
            .await;

        assert!(report.interrupted);
        assert!(broker.published().is_empty());
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_pacing_interrupts_the_wait() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.clone(), clock(), "q")
            .with_pacing(Pacing::Fixed(Duration::from_secs(60)));
        let (tx, rx) = shutdown::channel();

        let batch = producer.publish_batch(vec![draft("a", "email"), draft("b", "email")], rx);
        let trigger = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(true).unwrap();
        };
        let (report, ()) = tokio::join!(batch, trigger);

        assert!(report.interrupted);
        assert_eq!(keys(&broker), vec!["a"]);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn close_releases_the_broker() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.clone(), clock(), "q");
        producer.close().await.unwrap();
        assert_eq!(broker.close_calls(), 1);
    }
}
