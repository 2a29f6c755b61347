//! Discount Sync Core - Shared types and pure decision logic.
//!
//! This crate provides the pieces of the discount synchronisation engine that
//! need no I/O:
//! - `admin` - Reconciliation pipeline and Shopify client (uses this crate)
//! - `cli` - Command-line tools for migration, reconciliation and evaluation
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Eligibility and ownership decisions therefore depend on nothing
//! but their inputs and can be tested without a network.
//!
//! # Modules
//!
//! - [`types`] - Records, conditions, remote objects and type-safe IDs
//! - [`rules`] - Condition evaluation against an eligibility context
//! - [`ownership`] - Classification of remote objects as ours or not

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ownership;
pub mod rules;
pub mod types;

pub use ownership::{Ownership, OwnershipPolicy, OwnershipReason};
pub use rules::{ConditionError, EvaluationContext};
pub use types::*;
