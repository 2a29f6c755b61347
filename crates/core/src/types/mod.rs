//! Core types for discount synchronisation.
//!
//! This module provides type-safe wrappers for records, conditions and the
//! remote objects they map to.

pub mod condition;
pub mod id;
pub mod panel;
pub mod record;
pub mod remote;
pub mod status;

pub use condition::{Condition, ConditionType, Operator};
pub use id::*;
pub use panel::PanelSettings;
pub use record::{
    Activation, Classification, CombineFlags, DiscountRecord, RecordError, ValueKind,
};
pub use remote::{AppMetadata, PlainKind, RemoteObjectKind, RemoteObjectRef, RemoteObjectSpec};
pub use status::*;
