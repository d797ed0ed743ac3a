//! Sample catalog - `spindle seed` が投入するサンプルタスク
//!
//! 6 種類 × 3 件 = 18 件。ダッシュボードの動作確認用です。

use serde_json::json;

use crate::domain::{EnvelopeError, MaxRetries, Priority, TaskDraft, TaskId, TaskType};

struct Sample {
    id: &'static str,
    task_type: TaskType,
    priority: u8,
    payload: serde_json::Value,
}

fn samples() -> Vec<Sample> {
    vec![
        Sample {
            id: "email-001",
            task_type: TaskType::Email,
            priority: 3,
            payload: json!({
                "to": "user1@example.com",
                "subject": "Welcome Email",
                "body": "Welcome to our service!",
            }),
        },
        Sample {
            id: "email-002",
            task_type: TaskType::Email,
            priority: 2,
            payload: json!({
                "to": "admin@example.com",
                "subject": "Daily Report",
                "body": "Your daily report is ready",
            }),
        },
        Sample {
            id: "email-003",
            task_type: TaskType::Email,
            priority: 4,
            payload: json!({
                "to": "support@example.com",
                "subject": "New Ticket",
                "body": "A new support ticket has been created",
            }),
        },
        Sample {
            id: "notif-001",
            task_type: TaskType::Notification,
            priority: 5,
            payload: json!({
                "userId": "user123",
                "type": "alert",
                "message": "System maintenance scheduled",
            }),
        },
        Sample {
            id: "notif-002",
            task_type: TaskType::Notification,
            priority: 3,
            payload: json!({
                "userId": "user456",
                "type": "info",
                "message": "Your order has been shipped",
            }),
        },
        Sample {
            id: "notif-003",
            task_type: TaskType::Notification,
            priority: 2,
            payload: json!({
                "userId": "user789",
                "type": "reminder",
                "message": "Payment due in 3 days",
            }),
        },
        Sample {
            id: "report-001",
            task_type: TaskType::Report,
            priority: 2,
            payload: json!({"type": "monthly", "format": "pdf", "period": "2024-01"}),
        },
        Sample {
            id: "report-002",
            task_type: TaskType::Report,
            priority: 2,
            payload: json!({"type": "weekly", "format": "csv", "period": "2024-W05"}),
        },
        Sample {
            id: "report-003",
            task_type: TaskType::Report,
            priority: 1,
            payload: json!({"type": "daily", "format": "xlsx", "period": "2024-01-15"}),
        },
        Sample {
            id: "backup-001",
            task_type: TaskType::Backup,
            priority: 4,
            payload: json!({
                "database": "users",
                "type": "full",
                "destination": "s3://backups/users",
            }),
        },
        Sample {
            id: "backup-002",
            task_type: TaskType::Backup,
            priority: 3,
            payload: json!({
                "database": "orders",
                "type": "incremental",
                "destination": "s3://backups/orders",
            }),
        },
        Sample {
            id: "backup-003",
            task_type: TaskType::Backup,
            priority: 1,
            payload: json!({
                "database": "logs",
                "type": "archive",
                "destination": "s3://backups/logs",
            }),
        },
        Sample {
            id: "cleanup-001",
            task_type: TaskType::Cleanup,
            priority: 1,
            payload: json!({"target": "temp_files", "retentionDays": 7}),
        },
        Sample {
            id: "cleanup-002",
            task_type: TaskType::Cleanup,
            priority: 1,
            payload: json!({"target": "old_logs", "retentionDays": 30}),
        },
        Sample {
            id: "cleanup-003",
            task_type: TaskType::Cleanup,
            priority: 2,
            payload: json!({"target": "cache", "retentionDays": 1}),
        },
        Sample {
            id: "generic-001",
            task_type: TaskType::Generic,
            priority: 3,
            payload: json!({"action": "validate_data", "dataset": "customer_records"}),
        },
        Sample {
            id: "generic-002",
            task_type: TaskType::Generic,
            priority: 3,
            payload: json!({"action": "update_index", "collection": "products"}),
        },
        Sample {
            id: "generic-003",
            task_type: TaskType::Generic,
            priority: 3,
            payload: json!({"action": "sync_cache", "region": "us-east-1"}),
        },
    ]
}

/// サンプル 18 件を type 順のまま返す
///
/// 検証に失敗したサンプルがあれば全体をエラーにする
pub fn sample_catalog() -> Result<Vec<TaskDraft>, EnvelopeError> {
    samples().into_iter().map(Sample::into_draft).collect()
}

impl Sample {
    fn into_draft(self) -> Result<TaskDraft, EnvelopeError> {
        let serde_json::Value::Object(payload) = self.payload else {
            return Err(EnvelopeError::InvalidPayload(format!(
                "sample {} payload is not an object",
                self.id
            )));
        };
        Ok(TaskDraft::new(TaskId::new(self.id)?, self.task_type, payload)
            .with_priority(Priority::new(self.priority)?)
            .with_max_retries(MaxRetries::DEFAULT))
    }
}
