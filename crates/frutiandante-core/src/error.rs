//! # Error Types
//!
//! Domain-specific error types for frutiandante-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  frutiandante-core errors (this file)                                  │
//! │  ├── CoreError        - Cart and checkout rule violations              │
//! │  └── ValidationError  - Input and record validation failures           │
//! │                                                                         │
//! │  frutiandante-store errors (separate crate)                            │
//! │  └── StoreError       - Backend, storage and decode failures           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → notification         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the cart and checkout logic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Quantity exceeds the per-line maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: Quantity, max: Quantity },

    /// Quantity is smaller than the sale step for the product.
    ///
    /// ## When This Occurs
    /// - Adding 0.1 kg when the store sells in 0.25 kg steps
    /// - Adding 0 of anything
    #[error("Quantity {requested} is below the minimum step of {step}")]
    BelowStep { requested: Quantity, step: Quantity },

    /// Quantity is not a whole number for a product sold by the unit.
    #[error("Quantity {0} must be a whole number of units")]
    FractionalUnits(Quantity),

    /// Checkout attempted with an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used both for user input (checkout form, admin forms) and for records
/// decoded from the record store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid phone number, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::BelowStep {
            requested: Quantity::from_milli(100),
            step: Quantity::from_milli(250),
        };
        assert_eq!(
            err.to_string(),
            "Quantity 0.1 is below the minimum step of 0.25"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "phone".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
