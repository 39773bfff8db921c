//! Stock ceiling checks.
//!
//! Pure functions; every quantity decision the manager and the checkout
//! coordinator make goes through here.

/// Outcome of clamping a requested quantity to available stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecision {
    /// The full requested quantity fits within stock.
    Approved(u32),
    /// The request exceeded stock and was capped.
    Capped { granted: u32, requested: u32 },
}

impl StockDecision {
    /// The quantity actually granted.
    #[must_use]
    pub const fn granted(&self) -> u32 {
        match *self {
            Self::Approved(q) | Self::Capped { granted: q, .. } => q,
        }
    }
}

/// Whether `requested` units fit within `stock`.
#[must_use]
pub const fn within_stock(requested: u32, stock: u32) -> bool {
    requested <= stock
}

/// Clamp `requested` to `stock`, reporting whether a cap was applied.
#[must_use]
pub const fn clamp_to_stock(requested: u32, stock: u32) -> StockDecision {
    if requested <= stock {
        StockDecision::Approved(requested)
    } else {
        StockDecision::Capped {
            granted: stock,
            requested,
        }
    }
}
