//! # Validation Module
//!
//! Input validation for reservation batches.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (Order Management)                                     │
//! │  └── Shapes the order into OrderLine values                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Coordinator entry point                                       │
//! │  └── THIS MODULE: batch bounds, positive quantities                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage (SQLite)                                              │
//! │  ├── Conditional UPDATE guards (the authoritative decision)             │
//! │  └── CHECK constraints as a last line of defense                        │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::OrderLine;
use crate::MAX_ORDER_LINES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a reservation quantity.
///
/// ## Rules
/// - Must be positive (zero-quantity lines are caller bugs, not no-ops)
///
/// No upper bound: untracked items legitimately take arbitrarily large
/// quantities, and tracked items are bounded by their own stock anyway.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a manual stock count pushed by an admin or an external
/// stock-sync integration.
///
/// ## Rules
/// - Must be zero or greater (zero = sold out correction)
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "new_quantity".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Batch Validators
// =============================================================================

/// Validates a reservation batch before any counter is touched.
///
/// ## Rules
/// - Batch must not be empty
/// - Batch must not exceed [`MAX_ORDER_LINES`]
/// - Every line quantity must pass [`validate_quantity`]
pub fn validate_order_lines(lines: &[OrderLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::TooMany {
            field: "lines".to_string(),
            max: MAX_ORDER_LINES,
        });
    }

    for line in lines {
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(1_000_000).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn test_validate_stock_quantity() {
        assert!(validate_stock_quantity(0).is_ok());
        assert!(validate_stock_quantity(500).is_ok());
        assert!(validate_stock_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_order_lines_empty() {
        assert!(validate_order_lines(&[]).is_err());
    }

    #[test]
    fn test_validate_order_lines_too_many() {
        let lines: Vec<OrderLine> = (0..=MAX_ORDER_LINES)
            .map(|i| OrderLine::product(format!("p{i}"), 1))
            .collect();
        assert!(validate_order_lines(&lines).is_err());
    }

    #[test]
    fn test_validate_order_lines_bad_quantity() {
        let lines = vec![
            OrderLine::product("p1", 2),
            OrderLine::product("p2", 0),
        ];
        assert!(validate_order_lines(&lines).is_err());
    }

    #[test]
    fn test_validate_order_lines_ok() {
        let lines = vec![
            OrderLine::product("p1", 2),
            OrderLine::variant("p2", "v1", 7),
        ];
        assert!(validate_order_lines(&lines).is_ok());
    }
}
