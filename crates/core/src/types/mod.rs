//! Shared types for CardVault.
//!
//! All rows exchanged with the remote gateway live here, along with the
//! newtype IDs that keep entity references from being mixed up.

pub mod event;
pub mod id;
pub mod message;
pub mod notice;
pub mod price;
pub mod product;
pub mod session;
pub mod visitor;

pub use event::ChangeEvent;
pub use id::{BroadcastId, CorrelationId, MessageId, ProductId, SessionId};
pub use message::{ChatMessage, NewMessage, Sender};
pub use notice::{Broadcast, NewBroadcast, Severity};
pub use price::{CurrencyCode, Price, round_cents};
pub use product::{NewProduct, Product, StockLevel};
pub use session::{AdminSession, Theme};
pub use visitor::{Visitor, VisitorUpsert};
