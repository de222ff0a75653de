//! # Validation Module
//!
//! Input validation applied before the store opens a write transaction.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI (text field, colour picker)                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: length limits, colour format                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Empty names and titles are accepted. The add-category and add-item flows
//! store whatever the text field held.

use crate::error::ValidationError;
use crate::{MAX_CATEGORY_NAME_LEN, MAX_ITEM_TITLE_LEN, MAX_SEARCH_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a category name.
///
/// ## Example
/// ```rust
/// use todoey_core::validation::validate_category_name;
///
/// assert!(validate_category_name("Groceries").is_ok());
/// assert!(validate_category_name("").is_ok());
/// assert!(validate_category_name(&"x".repeat(201)).is_err());
/// ```
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    check_length("name", name, MAX_CATEGORY_NAME_LEN)
}

/// Validates an item title.
pub fn validate_item_title(title: &str) -> ValidationResult<()> {
    check_length("title", title, MAX_ITEM_TITLE_LEN)
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    check_length("query", query, MAX_SEARCH_LEN)?;
    Ok(query.to_string())
}

fn check_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Colour Tags
// =============================================================================

/// Normalizes a colour tag to `#RRGGBB`.
///
/// ## Rules
/// - Empty (after trimming) means "no colour" and stays empty
/// - Otherwise six hex digits, with or without a leading `#`
/// - Output is upper-case with a leading `#`
///
/// ## Example
/// ```rust
/// use todoey_core::validation::normalize_colour_tag;
///
/// assert_eq!(normalize_colour_tag("1abc9c").unwrap(), "#1ABC9C");
/// assert_eq!(normalize_colour_tag("").unwrap(), "");
/// assert!(normalize_colour_tag("teal").is_err());
/// ```
pub fn normalize_colour_tag(tag: &str) -> ValidationResult<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Ok(String::new());
    }

    let digits = tag.strip_prefix('#').unwrap_or(tag);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidFormat {
            field: "colour_tag".to_string(),
            reason: format!("expected #RRGGBB, got '{}'", tag),
        });
    }

    Ok(format!("#{}", digits.to_ascii_uppercase()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_name_limits() {
        assert!(validate_category_name("Home").is_ok());
        assert!(validate_category_name("").is_ok());
        assert!(validate_category_name(&"a".repeat(200)).is_ok());
        assert!(validate_category_name(&"a".repeat(201)).is_err());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 200 two-byte characters is still within the limit
        assert!(validate_category_name(&"é".repeat(200)).is_ok());
    }

    #[test]
    fn test_item_title_limits() {
        assert!(validate_item_title("Buy Eggos").is_ok());
        assert!(validate_item_title(&"a".repeat(501)).is_err());
    }

    #[test]
    fn test_search_query_is_trimmed() {
        assert_eq!(validate_search_query("  eggo ").unwrap(), "eggo");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }

    #[test]
    fn test_colour_tag_normalization() {
        assert_eq!(normalize_colour_tag("#1abc9c").unwrap(), "#1ABC9C");
        assert_eq!(normalize_colour_tag("E74C3C").unwrap(), "#E74C3C");
        assert_eq!(normalize_colour_tag("   ").unwrap(), "");
    }

    #[test]
    fn test_colour_tag_rejects_bad_input() {
        assert!(normalize_colour_tag("#12345").is_err());
        assert!(normalize_colour_tag("#GGGGGG").is_err());
        assert!(normalize_colour_tag("red").is_err());
    }
}
