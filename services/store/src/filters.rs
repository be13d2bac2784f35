//! Query-string driven filtering, search and ordering for the book list

#[cfg(test)]
use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ValidationErrors;
#[cfg(test)]
use crate::models::Book;

/// Raw list parameters: `?price=..&search=..&ordering=..`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookListParams {
    pub price: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// Sortable book columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Price,
    AuthorName,
}

impl OrderField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "price" => Some(OrderField::Price),
            "author_name" => Some(OrderField::AuthorName),
            _ => None,
        }
    }

    /// Column expression for SQL `ORDER BY`
    pub fn column(self) -> &'static str {
        match self {
            OrderField::Price => "b.price",
            OrderField::AuthorName => "b.author_name",
        }
    }
}

/// One `ordering` term; a leading `-` means descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookOrdering {
    pub field: OrderField,
    pub descending: bool,
}

impl BookOrdering {
    /// Parse a comma separated `ordering` value, dropping unknown fields
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter_map(|term| {
                let (descending, name) = match term.strip_prefix('-') {
                    Some(name) => (true, name),
                    None => (false, term),
                };
                OrderField::parse(name).map(|field| BookOrdering { field, descending })
            })
            .collect()
    }

    #[cfg(test)]
    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        let ordering = match self.field {
            OrderField::Price => a.price.cmp(&b.price),
            OrderField::AuthorName => a.author_name.cmp(&b.author_name),
        };
        if self.descending { ordering.reverse() } else { ordering }
    }
}

/// Parsed list filter shared by every repository implementation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Exact price match
    pub price: Option<Decimal>,
    /// Case-insensitive substring of name or author_name
    pub search: Option<String>,
    /// Applied in order; ties fall back to ascending id
    pub ordering: Vec<BookOrdering>,
}

impl TryFrom<BookListParams> for BookFilter {
    type Error = ValidationErrors;

    fn try_from(params: BookListParams) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::new();

        let price = match params.price.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match Decimal::from_str(raw) {
                Ok(price) => Some(price),
                Err(_) => {
                    errors.add("price", "Enter a number.");
                    None
                }
            },
        };

        errors.into_result()?;

        let search = params
            .search
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty());

        let ordering = params
            .ordering
            .as_deref()
            .map(BookOrdering::parse_list)
            .unwrap_or_default();

        Ok(BookFilter {
            price,
            search,
            ordering,
        })
    }
}

impl BookFilter {
    /// Whether a book passes the price filter and search term
    #[cfg(test)]
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(price) = self.price {
            if book.price != price {
                return false;
            }
        }

        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                book.name.to_lowercase().contains(&term)
                    || book.author_name.to_lowercase().contains(&term)
            }
            None => true,
        }
    }

    /// Total order over books for this filter's `ordering`
    #[cfg(test)]
    pub fn compare(&self, a: &Book, b: &Book) -> Ordering {
        self.ordering
            .iter()
            .map(|ordering| ordering.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }

    /// SQL `LIKE` pattern for the search term, with wildcards escaped
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|term| {
            let escaped = term
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, name: &str, price: i64, author_name: &str) -> Book {
        Book {
            id,
            name: name.to_string(),
            price: Decimal::from(price),
            author_name: author_name.to_string(),
            owner_id: None,
            rating: None,
        }
    }

    fn filter(price: Option<&str>, search: Option<&str>, ordering: Option<&str>) -> BookFilter {
        BookFilter::try_from(BookListParams {
            price: price.map(String::from),
            search: search.map(String::from),
            ordering: ordering.map(String::from),
        })
        .unwrap()
    }

    #[test]
    fn search_matches_name_or_author() {
        let f = filter(None, Some("Author 1"), None);

        assert!(f.matches(&book(1, "Test book 1", 1000, "Author 1")));
        assert!(!f.matches(&book(2, "Test book 2", 2000, "Author 2")));
        assert!(f.matches(&book(3, "Test book Author 1", 3000, "Author 3")));
    }

    #[test]
    fn search_is_case_insensitive() {
        let f = filter(None, Some("author 1"), None);
        assert!(f.matches(&book(1, "Test book 1", 1000, "AUTHOR 1")));
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(filter(None, Some("   "), None).search, None);
    }

    #[test]
    fn price_filter_is_exact() {
        let f = filter(Some("2000"), None, None);

        assert!(f.matches(&book(2, "Test book 2", 2000, "Author 2")));
        assert!(!f.matches(&book(1, "Test book 1", 1000, "Author 1")));
        // 2000 and 2000.00 are the same price
        assert!(filter(Some("2000.00"), None, None).matches(&book(2, "b", 2000, "a")));
    }

    #[test]
    fn unparsable_price_is_a_field_error() {
        let errors = BookFilter::try_from(BookListParams {
            price: Some("cheap".into()),
            ..Default::default()
        })
        .unwrap_err();

        assert_eq!(errors.get("price").unwrap()[0], "Enter a number.");
    }

    #[test]
    fn ordering_parses_direction_and_skips_unknown_fields() {
        let parsed = BookOrdering::parse_list("-price, name ,author_name");
        assert_eq!(
            parsed,
            vec![
                BookOrdering {
                    field: OrderField::Price,
                    descending: true
                },
                BookOrdering {
                    field: OrderField::AuthorName,
                    descending: false
                },
            ]
        );
        assert!(BookOrdering::parse_list("rating").is_empty());
    }

    #[test]
    fn descending_price_sort() {
        let f = filter(None, None, Some("-price"));
        let mut books = vec![
            book(1, "Test book 1", 1000, "Author 1"),
            book(2, "Test book 2", 2000, "Author 2"),
            book(3, "Test book Author 1", 3000, "Author 3"),
        ];

        books.sort_by(|a, b| f.compare(a, b));
        let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn ties_fall_back_to_id() {
        let f = filter(None, None, Some("author_name"));
        let mut books = vec![
            book(5, "x", 10, "Same"),
            book(2, "y", 20, "Same"),
            book(9, "z", 5, "Alpha"),
        ];

        books.sort_by(|a, b| f.compare(a, b));
        let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![9, 2, 5]);
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let f = filter(None, Some("100%_off"), None);
        assert_eq!(f.search_pattern().unwrap(), "%100\\%\\_off%");
    }
}
