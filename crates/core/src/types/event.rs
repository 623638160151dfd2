//! Change-subscription events.

use serde::{Deserialize, Serialize};

/// One event on an entity change feed.
///
/// The remote store delivers committed changes in order within a single
/// filtered stream; no ordering holds across independently-opened streams.
/// Deletes are not part of any feed this system consumes (messages and
/// broadcasts are insert/update-only, and product state is re-loaded rather
/// than streamed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "row", rename_all = "lowercase")]
pub enum ChangeEvent<T> {
    /// A newly committed row.
    Insert(T),
    /// An existing row whose mutable fields changed.
    Update(T),
}

impl<T> ChangeEvent<T> {
    /// The row carried by the event, regardless of kind.
    pub const fn row(&self) -> &T {
        match self {
            Self::Insert(row) | Self::Update(row) => row,
        }
    }

    /// Consume the event and return its row.
    pub fn into_row(self) -> T {
        match self {
            Self::Insert(row) | Self::Update(row) => row,
        }
    }
}
