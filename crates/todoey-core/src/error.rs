//! # Error Types
//!
//! Domain-specific error types for todoey-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  todoey-core errors (this file)                                        │
//! │  ├── CoreError        - Query specs that don't fit their scope         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  todoey-db errors (separate crate)                                     │
//! │  └── DbError          - Store failures (OwnerNotFound, ...)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors raised while checking a query specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The filter refers to a field the scope's records don't have.
    ///
    /// ## When This Occurs
    /// - `Filter::Done` over the category list
    #[error("Filter {filter} cannot be applied to {scope}")]
    FilterNotApplicable { filter: String, scope: String },

    /// The sort key refers to a field the scope's records don't have.
    ///
    /// ## When This Occurs
    /// - Sorting categories by `Title` or `DateCreated`
    /// - Sorting items by `Name`
    #[error("Cannot sort {scope} by {field}")]
    SortNotApplicable { field: String, scope: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write transaction opens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., malformed colour tag).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SortNotApplicable {
            field: "title".to_string(),
            scope: "all categories".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot sort all categories by title");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        };
        assert_eq!(err.to_string(), "name must be at most 200 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::InvalidFormat {
            field: "colour_tag".to_string(),
            reason: "expected #RRGGBB".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
