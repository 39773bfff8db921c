//! Persisted cart rows.
//!
//! The `cart_line` table is keyed by `(user_id, product_id)` with a unique
//! constraint; every read joins the product table so the snapshot embedded in
//! each line reflects the current row, not the one from insertion time.

use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;
use uuid::Uuid;

use greengrocer_core::{CartLineId, ProductId, UserId};

use super::{RepositoryError, products::snapshot_from_columns};
use crate::models::CartLine;
use crate::repository::CartRepository;

/// Postgres-backed remote cart repository.
#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new repository over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_line_row(row: &PgRow) -> Result<CartLine, RepositoryError> {
    let id: Uuid = row.try_get("id")?;
    let product_id: i32 = row.try_get("product_id")?;
    let quantity: i32 = row.try_get("quantity")?;
    let name: String = row.try_get("name")?;
    let price = row.try_get("price")?;
    let currency: String = row.try_get("currency")?;
    let stock: i32 = row.try_get("stock")?;
    let images: Vec<String> = row.try_get("images")?;

    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "cart line {id} has non-positive quantity {quantity}"
            ))
        })?;

    let product = snapshot_from_columns(product_id, name, price, &currency, stock, images)?;

    Ok(CartLine {
        id: CartLineId::from_uuid(id),
        product_id: ProductId::new(product_id),
        quantity,
        product,
    })
}

const SELECT_LINES: &str = r"
    SELECT c.id, c.product_id, c.quantity,
           p.name, p.price, p.currency, p.stock, p.images
    FROM cart_line c
    JOIN product p ON p.id = c.product_id
    WHERE c.user_id = $1
    ORDER BY c.created_at, c.id
";

impl CartRepository for PgCartRepository {
    #[instrument(skip(self))]
    async fn load(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query(SELECT_LINES)
            .bind(user.as_i32())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_line_row).collect()
    }

    #[instrument(skip(self, lines))]
    async fn save(&self, user: UserId, lines: &[CartLine]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_line WHERE user_id = $1")
            .bind(user.as_i32())
            .execute(&mut *tx)
            .await?;

        for line in lines {
            sqlx::query(
                r"
                INSERT INTO cart_line (id, user_id, product_id, quantity)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(line.id.as_uuid())
            .bind(user.as_i32())
            .bind(line.product_id.as_i32())
            .bind(i32::try_from(line.quantity).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    #[instrument(skip(self, line))]
    async fn upsert_line(&self, user: UserId, line: &CartLine) -> Result<(), RepositoryError> {
        // ON CONFLICT keeps a write racing a concurrent identical insert from
        // producing a duplicate: both resolve to the same (user, product) row.
        sqlx::query(
            r"
            INSERT INTO cart_line (id, user_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity
            ",
        )
        .bind(line.id.as_uuid())
        .bind(user.as_i32())
        .bind(line.product_id.as_i32())
        .bind(i32::try_from(line.quantity).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_line(
        &self,
        user: UserId,
        line_id: CartLineId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_line WHERE user_id = $1 AND id = $2")
            .bind(user.as_i32())
            .bind(line_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_line WHERE user_id = $1")
            .bind(user.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
