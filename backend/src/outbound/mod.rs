//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Adapters translate between domain types and the storage driver. They
//! contain no business logic.

pub mod persistence;
