//! Aggregate rating recomputation
//!
//! A book's rating is the arithmetic mean of every non-null `rate` across its
//! relations, rounded to two decimal places with ties away from zero. A book
//! nobody rated has no rating at all, never zero.

use anyhow::{Context, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::models::Rate;
use crate::models::book::MONEY_SCALE;
use crate::repositories::{BookRepository, RelationRepository};

/// Mean of the given rates, or `None` when there are none.
///
/// Midpoints round away from zero (4.125 becomes 4.13), not half-even as a
/// banker's-rounding decimal context would (4.12).
pub fn average_rating(rates: &[Rate]) -> Option<Decimal> {
    if rates.is_empty() {
        return None;
    }

    let total: i64 = rates.iter().map(|rate| i64::from(rate.get())).sum();
    let mean = Decimal::from(total) / Decimal::from(rates.len() as i64);

    let mut rating =
        mean.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rating.rescale(MONEY_SCALE);
    Some(rating)
}

/// Recompute a book's rating from its relations and persist it
pub async fn set_rating(
    books: &dyn BookRepository,
    relations: &dyn RelationRepository,
    book_id: i64,
) -> Result<Option<Decimal>> {
    let rates = relations
        .rates_for_book(book_id)
        .await
        .with_context(|| format!("failed to load rates for book {book_id}"))?;

    let rating = average_rating(&rates);

    books
        .set_rating(book_id, rating)
        .await
        .with_context(|| format!("failed to store rating for book {book_id}"))?;

    debug!(book_id, rated = rates.len(), rating = ?rating, "Book rating recomputed");
    Ok(rating)
}
