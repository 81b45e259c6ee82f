//! Validation errors for allocations, assets, and unit conversion.

use crate::types::Symbol;

/// Errors returned by the core engine's validating constructors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    /// Allocation has no entries.
    #[error("allocation is empty")]
    Empty,

    /// An asset appears more than once.
    #[error("duplicate asset: {0}")]
    Duplicate(Symbol),

    /// A fraction is negative, NaN, or infinite.
    #[error("fraction for {symbol} must be finite and >= 0, got {value}")]
    InvalidFraction { symbol: Symbol, value: f64 },

    /// All fractions are zero, so nothing can be normalized.
    #[error("allocation fractions sum to zero")]
    ZeroSum,

    /// Asset is not present in the registry.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// Strategy name is not registered.
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Amount cannot be expressed in base units.
    #[error("cannot convert {amount} to base units: {reason}")]
    Units { amount: String, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(AllocationError::Empty.to_string(), "allocation is empty");
        assert_eq!(
            AllocationError::Duplicate(Symbol::new("WETH")).to_string(),
            "duplicate asset: WETH"
        );
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(AllocationError::ZeroSum);
        assert!(err.to_string().contains("zero"));
    }
}
