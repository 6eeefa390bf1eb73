//! Instruction broker adapters
//!
//! Two interchangeable implementations of the broker port: an in-process
//! FIFO for single-node deployments and tests, and a durable SQLite-backed
//! queue that survives restarts. The durable broker is the default; paired
//! with the due scanner it closes the gap between a store insert and a lost
//! push.

mod memory;
mod sqlite;

pub use memory::MemoryBroker;
pub use sqlite::SqliteBroker;
