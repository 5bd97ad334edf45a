use sqlx::{SqliteConnection, SqlitePool};

use larder_core::positional::{place, to_position};
use larder_core::{Pantry, PantryItem};

use super::index_by_key;

#[derive(Debug, Clone)]
pub struct PantryRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct NameRow {
    name: String,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    pantry_name: String,
    pos: i64,
    product_id: i64,
    amount: f64,
}

impl PantryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Pantry>, sqlx::Error> {
        self.load(None).await
    }

    pub async fn get(&self, name: &str) -> Result<Option<Pantry>, sqlx::Error> {
        Ok(self.load(Some(name)).await?.into_iter().next())
    }

    /// Replaces the pantry and all of its item rows.
    pub async fn set(&self, pantry: &Pantry) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        tracing::trace!(pantry = %pantry.name, "Replacing pantry rows");
        Self::delete_children(&mut *tx, &pantry.name).await?;

        sqlx::query("INSERT INTO pantries (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
            .bind(&pantry.name)
            .execute(&mut *tx)
            .await?;

        for (pos, item) in pantry.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO pantry_items (pantry_name, pos, product_id, amount) VALUES (?, ?, ?, ?)",
            )
            .bind(&pantry.name)
            .bind(pos as i64)
            .bind(i64::from(item.product))
            .bind(item.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Returns false when no pantry has this name.
    pub async fn delete(&self, name: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        tracing::trace!(pantry = %name, "Deleting pantry rows");
        Self::delete_children(&mut *tx, name).await?;
        let result = sqlx::query("DELETE FROM pantries WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn delete_children(conn: &mut SqliteConnection, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM pantry_items WHERE pantry_name = ?")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn load(&self, name: Option<&str>) -> Result<Vec<Pantry>, sqlx::Error> {
        tracing::trace!(pantry = ?name, "Loading pantries");

        let mut tx = self.pool.begin().await?;

        let names: Vec<NameRow> = sqlx::query_as(
            "SELECT name FROM pantries WHERE ?1 IS NULL OR name = ?1 ORDER BY name",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;

        let rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT pantry_name, pos, product_id, amount FROM pantry_items WHERE ?1 IS NULL OR pantry_name = ?1",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut pantries: Vec<Pantry> =
            names.into_iter().map(|row| Pantry::new(row.name)).collect();
        let index = index_by_key(pantries.iter().map(|p| p.name.clone()));

        for row in rows {
            let slot = index.get(&row.pantry_name).copied();
            let pos = to_position(row.pos);
            let product = u32::try_from(row.product_id).ok();
            let (Some(slot), Some(pos), Some(product)) = (slot, pos, product) else {
                tracing::warn!(
                    pantry = %row.pantry_name,
                    pos = row.pos,
                    "Dropping orphaned pantry item row"
                );
                continue;
            };
            place(&mut pantries[slot].items, pos, PantryItem::new(product, row.amount));
        }

        Ok(pantries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    struct TestContext {
        repo: PantryRepository,
        _temp_dir: TempDir,
    }

    async fn setup_repo() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            repo: PantryRepository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_replace_does_not_keep_old_items() {
        let ctx = setup_repo().await;
        let (eggs, milk) = (1, 2);

        ctx.repo
            .set(&Pantry::new("p1").with_items(vec![
                PantryItem::new(eggs, 12.0),
                PantryItem::new(milk, 2.0),
            ]))
            .await
            .unwrap();
        ctx.repo
            .set(&Pantry::new("p1").with_items(vec![PantryItem::new(eggs, 6.0)]))
            .await
            .unwrap();

        let pantry = ctx.repo.get("p1").await.unwrap().unwrap();
        assert_eq!(pantry.items, vec![PantryItem::new(eggs, 6.0)]);
    }

    #[tokio::test]
    async fn test_empty_pantry_round_trips() {
        let ctx = setup_repo().await;
        ctx.repo.set(&Pantry::new("empty")).await.unwrap();
        assert_eq!(ctx.repo.get("empty").await.unwrap(), Some(Pantry::new("empty")));
    }

    #[tokio::test]
    async fn test_get_does_not_mix_pantries() {
        let ctx = setup_repo().await;
        let home = Pantry::new("home").with_items(vec![PantryItem::new(1, 1.0)]);
        let cabin = Pantry::new("cabin").with_items(vec![PantryItem::new(2, 2.0)]);
        ctx.repo.set(&home).await.unwrap();
        ctx.repo.set(&cabin).await.unwrap();

        assert_eq!(ctx.repo.get("home").await.unwrap(), Some(home.clone()));
        assert_eq!(ctx.repo.list().await.unwrap(), vec![cabin, home]);
    }

    #[tokio::test]
    async fn test_delete_pantry() {
        let ctx = setup_repo().await;
        ctx.repo
            .set(&Pantry::new("old").with_items(vec![PantryItem::new(1, 1.0)]))
            .await
            .unwrap();

        assert!(ctx.repo.delete("old").await.unwrap());
        assert!(ctx.repo.list().await.unwrap().is_empty());
    }
}
