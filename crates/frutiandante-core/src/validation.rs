//! # Validation Module
//!
//! Input validation utilities for Frutiandante.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront / admin forms                                     │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Checkout details, admin edits before they are written             │
//! │  └── Records decoded from live snapshots (Record::validate)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Record store security rules                                  │
//! │  └── Authorization (rejections go to the error channel)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_CART_ITEMS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name: non-empty, at most 120 characters.
///
/// ```rust
/// use frutiandante_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Frutillas 500g").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 120)
}

pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_text("category name", name, 60)
}

/// Validates the buyer's name entered at checkout.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();
    validate_text("customer name", trimmed, 80)?;
    if trimmed.chars().count() < 2 {
        return Err(ValidationError::TooShort {
            field: "customer name".to_string(),
            min: 2,
        });
    }
    Ok(())
}

pub fn validate_address(address: &str) -> ValidationResult<()> {
    validate_text("address", address, 200)
}

/// Validates a search query and returns it trimmed.
/// Empty is fine (lists everything); at most 100 characters.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a document identifier: non-empty and free of path separators.
pub fn validate_document_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.contains('/') {
        return Err(ValidationError::InvalidFormat {
            field: "id".to_string(),
            reason: "must not contain '/'".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address (shape only).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number as typed at checkout.
///
/// ## Rules
/// - Spaces, dashes, parentheses and a leading `+` are allowed
/// - 8 to 15 digits once those are stripped
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let allowed = trimmed
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0));
    if !allowed {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "may only contain digits, spaces, dashes and a leading +".to_string(),
        });
    }

    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    if !(8..=15).contains(&digits) {
        return Err(ValidationError::OutOfRange {
            field: "phone digits".to_string(),
            min: 8,
            max: 15,
        });
    }

    Ok(())
}

/// Validates the store's WhatsApp number: digits only, international
/// format without `+` (what `wa.me` links expect).
///
/// ```rust
/// use frutiandante_core::validation::validate_whatsapp_number;
///
/// assert!(validate_whatsapp_number("56912345678").is_ok());
/// assert!(validate_whatsapp_number("+56 9 1234 5678").is_err());
/// ```
pub fn validate_whatsapp_number(number: &str) -> ValidationResult<()> {
    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "whatsapp number".to_string(),
        });
    }

    if !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "whatsapp number".to_string(),
            reason: "must contain digits only, in international format".to_string(),
        });
    }

    if !(8..=15).contains(&number.len()) {
        return Err(ValidationError::OutOfRange {
            field: "whatsapp number digits".to_string(),
            min: 8,
            max: 15,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price: zero is allowed (promotional items), negative is not.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a discount rate: 0% to 100%.
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more distinct line fits in the cart.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
