use sqlx::{SqliteConnection, SqlitePool};

use larder_core::{Product, Record};

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    batch_size: f64,
    price: f64,
    provider: String,
    code0: String,
    code1: String,
    code2: String,
}

impl ProductRow {
    fn into_product(self) -> Option<Product> {
        let Ok(id) = u32::try_from(self.id) else {
            tracing::warn!(id = self.id, "Dropping product row with out-of-range id");
            return None;
        };
        Some(Product {
            id,
            name: self.name,
            batch_size: self.batch_size,
            price: self.price,
            provider: self.provider,
            codes: [self.code0, self.code1, self.code2],
        })
    }
}

const SELECT_PRODUCTS: &str =
    "SELECT id, name, batch_size, price, provider, code0, code1, code2 FROM products";

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Product>, sqlx::Error> {
        tracing::trace!("Listing products");
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("{} ORDER BY id", SELECT_PRODUCTS))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().filter_map(ProductRow::into_product).collect())
    }

    pub async fn get(&self, id: u32) -> Result<Option<Product>, sqlx::Error> {
        tracing::trace!(id, "Fetching product");
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("{} WHERE id = ?", SELECT_PRODUCTS))
                .bind(i64::from(id))
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(ProductRow::into_product))
    }

    /// Inserts or replaces a product, drawing a fresh id when it has none.
    ///
    /// Returns the product's id.
    pub async fn set(&self, product: &Product) -> Result<u32, sqlx::Error> {
        let mut product = product.clone();
        let mut tx = self.pool.begin().await?;

        if product.needs_key() {
            loop {
                product.assign_random_key();
                if !Self::exists(&mut *tx, product.id).await? {
                    break;
                }
            }
        }

        tracing::trace!(id = product.id, "Upserting product");
        sqlx::query(
            r#"
            INSERT INTO products (id, name, batch_size, price, provider, code0, code1, code2)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                batch_size = excluded.batch_size,
                price = excluded.price,
                provider = excluded.provider,
                code0 = excluded.code0,
                code1 = excluded.code1,
                code2 = excluded.code2
            "#,
        )
        .bind(i64::from(product.id))
        .bind(&product.name)
        .bind(product.batch_size)
        .bind(product.price)
        .bind(&product.provider)
        .bind(&product.codes[0])
        .bind(&product.codes[1])
        .bind(&product.codes[2])
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product.id)
    }

    /// Returns false when no product has this id.
    pub async fn delete(&self, id: u32) -> Result<bool, sqlx::Error> {
        tracing::trace!(id, "Deleting product");
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(i64::from(id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists(conn: &mut SqliteConnection, id: u32) -> Result<bool, sqlx::Error> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = ?")
            .bind(i64::from(id))
            .fetch_optional(&mut *conn)
            .await?;
        Ok(found.is_some())
    }
}
