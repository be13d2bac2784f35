//! Book model, write payloads and the response projection

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ValidationErrors;
use crate::models::present;
use crate::models::user::Reader;

/// Decimal places stored for prices and ratings
pub const MONEY_SCALE: u32 = 2;

const MAX_TEXT_LENGTH: usize = 255;
/// NUMERIC(7, 2): five digits before the point
const MAX_WHOLE_DIGITS: u32 = 5;

/// Book entity
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub author_name: String,
    /// Absent for books imported without an owner
    pub owner_id: Option<Uuid>,
    /// Mean of the non-null relation rates, unset until one exists
    pub rating: Option<Decimal>,
}

/// A book together with the values derived from its relations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetail {
    pub book: Book,
    /// Owner's username, empty when the book has no owner
    pub owner_name: String,
    /// Number of relations with `like` set
    pub annotated_likes: i64,
    pub readers: Vec<Reader>,
}

/// Validated payload for creating a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub name: String,
    pub price: Decimal,
    pub author_name: String,
}

/// Validated set of field changes for an existing book
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub author_name: Option<String>,
}

impl BookChanges {
    #[cfg(test)]
    pub fn apply(&self, book: &mut Book) {
        if let Some(name) = &self.name {
            book.name = name.clone();
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(author_name) = &self.author_name {
            book.author_name = author_name.clone();
        }
    }
}

/// Raw book body as sent by clients.
///
/// Anything else in the body (notably `owner`, `rating`) is ignored: the
/// owner comes from the authenticated caller and the rating is derived.
///
/// Fields stay raw JSON until validated so a value of the wrong type is
/// reported against its field instead of failing the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub author_name: Option<Value>,
}

impl BookPayload {
    /// Validate a create request; every field is required
    pub fn into_new_book(self) -> Result<NewBook, ValidationErrors> {
        let BookChanges {
            name,
            price,
            author_name,
        } = self.into_changes(false)?;

        match (name, price, author_name) {
            (Some(name), Some(price), Some(author_name)) => Ok(NewBook {
                name,
                price,
                author_name,
            }),
            _ => {
                let mut errors = ValidationErrors::new();
                errors.add("non_field_errors", "Incomplete book payload.");
                Err(errors)
            }
        }
    }

    /// Validate an update; with `partial` unset every field is required
    pub fn into_changes(self, partial: bool) -> Result<BookChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = validate_text("name", self.name, partial, &mut errors);
        let author_name = validate_text("author_name", self.author_name, partial, &mut errors);
        let price = match self.price {
            Some(value) => {
                parse_price(&value, &mut errors).and_then(|price| validate_price(price, &mut errors))
            }
            None => {
                if !partial {
                    errors.add("price", "This field is required.");
                }
                None
            }
        };

        errors.into_result()?;

        Ok(BookChanges {
            name,
            price,
            author_name,
        })
    }
}

fn validate_text(
    field: &'static str,
    value: Option<Value>,
    partial: bool,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = match value {
        Some(Value::String(value)) => value,
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Null) => {
            errors.add(field, "This field may not be null.");
            return None;
        }
        Some(_) => {
            errors.add(field, "Not a valid string.");
            return None;
        }
        None => {
            if !partial {
                errors.add(field, "This field is required.");
            }
            return None;
        }
    };

    let value = value.trim().to_string();
    if value.is_empty() {
        errors.add(field, "This field may not be blank.");
        return None;
    }
    if value.chars().count() > MAX_TEXT_LENGTH {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_TEXT_LENGTH} characters."),
        );
        return None;
    }

    Some(value)
}

/// Accept a JSON number or a numeric string
fn parse_price(value: &Value, errors: &mut ValidationErrors) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(number) => {
            let raw = number.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
        }
        Value::String(raw) => Decimal::from_str(raw.trim()).ok(),
        Value::Null => {
            errors.add("price", "This field may not be null.");
            return None;
        }
        _ => None,
    };

    if parsed.is_none() {
        errors.add("price", "A valid number is required.");
    }
    parsed
}

fn validate_price(price: Decimal, errors: &mut ValidationErrors) -> Option<Decimal> {
    let normalized = price.normalize();
    if normalized.scale() > MONEY_SCALE {
        errors.add(
            "price",
            format!("Ensure that there are no more than {MONEY_SCALE} decimal places."),
        );
        return None;
    }
    if normalized.trunc().abs() >= Decimal::from(10_i64.pow(MAX_WHOLE_DIGITS)) {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {MAX_WHOLE_DIGITS} digits before the decimal point."
            ),
        );
        return None;
    }

    Some(fixed_scale(normalized))
}

/// Round to two places and pin the scale so `5` renders as `5.00`
pub fn fixed_scale(value: Decimal) -> Decimal {
    let mut value = value.round_dp(MONEY_SCALE);
    value.rescale(MONEY_SCALE);
    value
}

/// Book as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookResponse {
    pub id: i64,
    pub name: String,
    #[serde(serialize_with = "serialize_money")]
    pub price: Decimal,
    pub author_name: String,
    pub annotated_likes: i64,
    #[serde(serialize_with = "serialize_optional_money")]
    pub rating: Option<Decimal>,
    pub owner_name: String,
    pub readers: Vec<Reader>,
}

impl From<BookDetail> for BookResponse {
    fn from(detail: BookDetail) -> Self {
        let BookDetail {
            book,
            owner_name,
            annotated_likes,
            readers,
        } = detail;

        Self {
            id: book.id,
            name: book.name,
            price: book.price,
            author_name: book.author_name,
            annotated_likes,
            rating: book.rating,
            owner_name,
            readers,
        }
    }
}

fn serialize_money<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&fixed_scale(*value).to_string())
}

fn serialize_optional_money<S: Serializer>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serialize_money(value, serializer),
        None => serializer.serialize_none(),
    }
}
