//! Per-(user, book) relation: like, bookmark and rate

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ValidationErrors;
use crate::models::present;

/// A user's rating of a book, always within `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rate(i16);

/// Rejected rate value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct InvalidRate(pub String);

impl Rate {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    pub fn get(self) -> i16 {
        self.0
    }

    /// Accept an integer, or a string holding one
    fn from_json(value: &Value) -> Result<Self, InvalidRate> {
        let parsed = match value {
            Value::Number(number) => number.as_i64(),
            Value::String(raw) => raw.trim().parse::<i64>().ok(),
            _ => None,
        };

        let rendered = match value {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };

        parsed
            .ok_or_else(|| InvalidRate(rendered.clone()))
            .and_then(|raw| Rate::try_from(raw).map_err(|_| InvalidRate(rendered)))
    }
}

impl TryFrom<i64> for Rate {
    type Error = InvalidRate;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Rate(value as i16))
        } else {
            Err(InvalidRate(value.to_string()))
        }
    }
}

impl TryFrom<i16> for Rate {
    type Error = InvalidRate;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Rate::try_from(i64::from(value))
    }
}

/// Relation entity, keyed by `(user_id, book_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    #[serde(skip)]
    pub user_id: Uuid,
    #[serde(rename = "book")]
    pub book_id: i64,
    pub like: bool,
    pub in_bookmarks: bool,
    pub rate: Option<Rate>,
}

impl Relation {
    /// Fresh relation with every flag cleared
    #[cfg(test)]
    pub fn new(user_id: Uuid, book_id: i64) -> Self {
        Self {
            user_id,
            book_id,
            like: false,
            in_bookmarks: false,
            rate: None,
        }
    }
}

/// Raw relation patch as sent by clients.
///
/// Every field is kept as raw JSON until [`RelationPatch::validate`].
/// `rate` distinguishes "absent" (`None`) from an explicit `null`
/// (`Some(Value::Null)`), which clears the rating.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationPatch {
    #[serde(default, deserialize_with = "present")]
    pub like: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub in_bookmarks: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub rate: Option<Value>,
}

fn validate_flag(
    field: &'static str,
    value: Option<Value>,
    errors: &mut ValidationErrors,
) -> Option<bool> {
    match value? {
        Value::Bool(flag) => Some(flag),
        Value::Null => {
            errors.add(field, "This field may not be null.");
            None
        }
        _ => {
            errors.add(field, "Must be a valid boolean.");
            None
        }
    }
}

/// Validated relation patch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationChanges {
    pub like: Option<bool>,
    pub in_bookmarks: Option<bool>,
    /// `Some(None)` clears the rate
    pub rate: Option<Option<Rate>>,
}

impl RelationPatch {
    pub fn validate(self) -> Result<RelationChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let like = validate_flag("like", self.like, &mut errors);
        let in_bookmarks = validate_flag("in_bookmarks", self.in_bookmarks, &mut errors);
        let rate = match self.rate {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => match Rate::from_json(&value) {
                Ok(rate) => Some(Some(rate)),
                Err(e) => {
                    errors.add("rate", e.to_string());
                    None
                }
            },
        };

        errors.into_result()?;

        Ok(RelationChanges {
            like,
            in_bookmarks,
            rate,
        })
    }
}

impl RelationChanges {
    /// Whether persisting these changes requires a rating recompute
    pub fn touches_rate(&self) -> bool {
        self.rate.is_some()
    }

    pub fn apply(&self, relation: &mut Relation) {
        if let Some(like) = self.like {
            relation.like = like;
        }
        if let Some(in_bookmarks) = self.in_bookmarks {
            relation.in_bookmarks = in_bookmarks;
        }
        if let Some(rate) = self.rate {
            relation.rate = rate;
        }
    }
}
