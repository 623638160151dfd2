//! CardVault Client - Storefront-side state synchronization.
//!
//! This library owns every piece of storefront state that must be reconciled
//! with the remote realtime database: the product catalog (seed-merged with
//! remote rows), the cart, the favorites set, the visitor's session
//! identity, and the live-chat transcript with its optimistic sends.
//!
//! # Architecture
//!
//! - All remote access goes through the [`gateway::Gateway`] trait; the
//!   production implementation is [`gateway::RestGateway`], and
//!   [`gateway::MemoryGateway`] backs tests and offline demos.
//! - Stores are plain `&mut self` state machines driven by the caller's
//!   event loop; nothing here spawns threads or holds locks across awaits.
//! - Every user-visible failure is pushed through [`notify::Notifier`];
//!   nothing in this crate is fatal to the process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod favorites;
pub mod gateway;
pub mod notify;
pub mod payment;
pub mod router;
pub mod seed;
pub mod session;
pub mod storage;

pub use cart::{CartEngine, CartLine, CartPolicy, CartTotals, CheckoutSummary};
pub use catalog::CatalogStore;
pub use chat::{ChatEntry, ChatState, ChatSynchronizer};
pub use config::ClientConfig;
pub use payment::PaymentClient;
pub use favorites::FavoriteSet;
pub use gateway::{Gateway, GatewayError, MemoryGateway, RestGateway, Subscription};
pub use notify::{Notice, NoticeStream, Notifier};
pub use router::{View, ViewRouter};
pub use session::SessionManager;
pub use storage::LocalStore;
