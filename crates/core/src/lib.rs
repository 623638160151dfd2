//! CardVault Core - Shared types library.
//!
//! This crate provides common types used across all CardVault components:
//! - `client` - Storefront-side state synchronization (catalog, cart, chat)
//! - `admin` - Operator-side panel (inventory, visitors, support desk)
//! - `cli` - Command-line tools for seeding and management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. Every record that crosses the remote gateway boundary is defined
//! here as a strongly-typed struct validated by serde on the way in.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money helpers, and the gateway row types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
