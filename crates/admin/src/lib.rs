//! Discount Sync Admin library.
//!
//! This crate provides the synchronisation engine as a library, allowing it
//! to be driven by the HTTP binary, the CLI, and tests alike.
//!
//! # Security
//!
//! This crate holds a HIGH PRIVILEGE Shopify Admin API token. It can create
//! and delete discounts and rewrite shop metafields. Only deploy on
//! private infrastructure.
//!
//! # Modules
//!
//! - [`store`] - The remote store trait the pipeline runs against
//! - [`shopify`] - Shopify Admin GraphQL implementation of that trait
//! - [`sync`] - Migration, reconciliation and batched persistence
//! - [`routes`] - JSON API over the engine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod store;
pub mod sync;
