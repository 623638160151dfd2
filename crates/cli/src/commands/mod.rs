//! CLI command implementations.

pub mod broadcast;
pub mod inventory;
pub mod seed;
pub mod visitors;
