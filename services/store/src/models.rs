//! Domain models and request/response payloads

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub mod book;
pub mod relation;
pub mod user;

pub use book::{Book, BookChanges, BookDetail, BookPayload, BookResponse, NewBook};
pub use relation::{Rate, Relation, RelationPatch};
pub use user::{Reader, User};

/// Keep an explicit `null` apart from an absent field. Pair with
/// `#[serde(default)]` so absent fields stay `None`.
pub(crate) fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
