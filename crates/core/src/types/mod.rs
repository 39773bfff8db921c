//! Shared value types.

mod id;
mod price;

pub use id::{CartLineId, ProductId, UserId};
pub use price::{CurrencyCode, Price};
