//! Domain model (envelope, ids, task types).
//!
//! ここはワイヤ契約そのものです。ブローカーや HTTP には依存しません。

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod task_type;

pub use self::envelope::{
    MaxRetries, Payload, Priority, TaskDraft, TaskEnvelope, payload_from_json,
};
pub use self::errors::EnvelopeError;
pub use self::ids::TaskId;
pub use self::task_type::TaskType;
