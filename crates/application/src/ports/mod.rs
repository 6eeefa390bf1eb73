//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod application_store;
mod broker;
mod task_store;
mod webhook;

pub use application_store::ApplicationStore;
#[cfg(test)]
pub use application_store::MockApplicationStore;
pub use broker::InstructionBroker;
#[cfg(test)]
pub use broker::MockInstructionBroker;
#[cfg(test)]
pub use task_store::MockTaskStore;
pub use task_store::{TaskChanges, TaskStore};
#[cfg(test)]
pub use webhook::MockWebhookPort;
pub use webhook::{DeliveryOutcome, WebhookPort, WebhookRequest};
