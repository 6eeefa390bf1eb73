//! Value Objects - Immutable, identity-less domain primitives

mod app_id;
mod backoff;
mod due;
mod instruction;
mod key_id;
mod task_id;
mod webhook_url;

pub use app_id::AppId;
pub use backoff::Backoff;
pub use due::DueFactory;
pub use instruction::Instruction;
pub use key_id::KeyId;
pub use task_id::TaskId;
pub use webhook_url::WebhookUrl;
