//! Product catalog access.
//!
//! Queries use the runtime-checked sqlx API so the crate builds without a
//! live database; rows are validated through [`ProductSnapshot::new`] and
//! malformed data surfaces as `RepositoryError::DataCorruption`.

use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;

use greengrocer_core::{CurrencyCode, Price, ProductId};

use super::RepositoryError;
use crate::models::ProductSnapshot;
use crate::repository::ProductCatalog;

/// Postgres-backed product catalog.
#[derive(Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    /// Create a new catalog over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build a validated snapshot from raw column values.
pub(crate) fn snapshot_from_columns(
    id: i32,
    name: String,
    price: Decimal,
    currency: &str,
    stock: i32,
    images: Vec<String>,
) -> Result<ProductSnapshot, RepositoryError> {
    let product_id = ProductId::new(id);
    let currency_code = CurrencyCode::from_code(currency).ok_or_else(|| {
        RepositoryError::DataCorruption(format!(
            "product {product_id} has unknown currency {currency:?}"
        ))
    })?;
    let stock = u32::try_from(stock).map_err(|_| {
        RepositoryError::DataCorruption(format!("product {product_id} has negative stock {stock}"))
    })?;

    ProductSnapshot::new(
        product_id,
        name,
        Price::new(price, currency_code),
        stock,
        images,
    )
    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

fn map_product_row(row: &PgRow) -> Result<ProductSnapshot, RepositoryError> {
    let id: i32 = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let price: Decimal = row.try_get("price")?;
    let currency: String = row.try_get("currency")?;
    let stock: i32 = row.try_get("stock")?;
    let images: Vec<String> = row.try_get("images")?;

    snapshot_from_columns(id, name, price, &currency, stock, images)
}

impl ProductCatalog for PgProductCatalog {
    #[instrument(skip(self))]
    async fn get(
        &self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT id, name, price, currency, stock, images
            FROM product
            WHERE id = $1
            ",
        )
        .bind(product_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_product_row).transpose()
    }

    #[instrument(skip(self))]
    async fn update_stock(
        &self,
        product_id: ProductId,
        new_stock: u32,
    ) -> Result<(), RepositoryError> {
        let stock = i32::try_from(new_stock).unwrap_or(i32::MAX);

        let result = sqlx::query(
            r"
            UPDATE product
            SET stock = $1
            WHERE id = $2
            ",
        )
        .bind(stock)
        .bind(product_id.as_i32())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_rejects_unknown_currency() {
        let result =
            snapshot_from_columns(1, "Apples".to_string(), Decimal::new(199, 2), "ZZZ", 4, vec![]);
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn snapshot_rejects_negative_stock() {
        let result =
            snapshot_from_columns(1, "Apples".to_string(), Decimal::new(199, 2), "USD", -1, vec![]);
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn snapshot_accepts_valid_row() {
        let snapshot =
            snapshot_from_columns(1, "Apples".to_string(), Decimal::new(199, 2), "USD", 4, vec![])
                .expect("valid row");
        assert_eq!(snapshot.stock, 4);
        assert_eq!(snapshot.price.currency_code, CurrencyCode::USD);
    }
}
