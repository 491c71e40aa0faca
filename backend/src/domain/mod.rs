//! Domain model, use-cases and ports.
//!
//! Public surface:
//! - [`Ambulance`] and its waiting-list types, with reconciliation rules.
//! - [`WaitingListService`] orchestrating store access for handlers.
//! - [`Error`] / [`ErrorCode`] transport-agnostic failure payload.
//! - [`TraceId`] request correlation identifier.

pub mod ambulance;
pub mod error;
pub mod ports;
pub mod trace_id;
pub mod waiting_list_service;

pub use self::ambulance::{
    Ambulance, Condition, WaitingListEntry, WaitingListEntryPatch, WaitingListError,
};
pub use self::error::{Error, ErrorCode};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::waiting_list_service::{
    DEFAULT_ENTRY_DURATION_MINUTES, NEW_ID_PLACEHOLDER, NewWaitingListEntry, WaitingListService,
};
