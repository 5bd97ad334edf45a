use sqlx::{SqliteConnection, SqlitePool};

use larder_core::positional::{place, to_position};
use larder_core::{ShoppingItem, ShoppingList, ShoppingListKey};

use super::index_by_key;

/// Shopping lists keyed by the `(menu_name, pantry_name)` pair.
#[derive(Debug, Clone)]
pub struct ShoppingListRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ListRow {
    menu_name: String,
    pantry_name: String,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    menu_name: String,
    pantry_name: String,
    pos: i64,
    product_id: i64,
    amount: f64,
    done: bool,
}

impl ShoppingListRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<ShoppingList>, sqlx::Error> {
        self.load(None).await
    }

    pub async fn get(&self, key: &ShoppingListKey) -> Result<Option<ShoppingList>, sqlx::Error> {
        Ok(self.load(Some(key)).await?.into_iter().next())
    }

    /// Replaces the shopping list and all of its item rows.
    pub async fn set(&self, list: &ShoppingList) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        tracing::trace!(menu = %list.menu, pantry = %list.pantry, "Replacing shopping list rows");
        Self::delete_children(&mut *tx, &list.menu, &list.pantry).await?;

        sqlx::query(
            "INSERT INTO shopping_lists (menu_name, pantry_name) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(&list.menu)
        .bind(&list.pantry)
        .execute(&mut *tx)
        .await?;

        for (pos, item) in list.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO shopping_list_items (menu_name, pantry_name, pos, product_id, amount, done)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&list.menu)
            .bind(&list.pantry)
            .bind(pos as i64)
            .bind(i64::from(item.product))
            .bind(item.amount)
            .bind(item.done)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Returns false when no shopping list has this key.
    pub async fn delete(&self, key: &ShoppingListKey) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        tracing::trace!(menu = %key.menu, pantry = %key.pantry, "Deleting shopping list rows");
        Self::delete_children(&mut *tx, &key.menu, &key.pantry).await?;
        let result =
            sqlx::query("DELETE FROM shopping_lists WHERE menu_name = ? AND pantry_name = ?")
                .bind(&key.menu)
                .bind(&key.pantry)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn delete_children(
        conn: &mut SqliteConnection,
        menu: &str,
        pantry: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM shopping_list_items WHERE menu_name = ? AND pantry_name = ?")
            .bind(menu)
            .bind(pantry)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn load(&self, key: Option<&ShoppingListKey>) -> Result<Vec<ShoppingList>, sqlx::Error> {
        tracing::trace!(key = ?key, "Loading shopping lists");
        let menu = key.map(|k| k.menu.as_str());
        let pantry = key.map(|k| k.pantry.as_str());

        let mut tx = self.pool.begin().await?;

        let lists: Vec<ListRow> = sqlx::query_as(
            r#"
            SELECT menu_name, pantry_name FROM shopping_lists
            WHERE ?1 IS NULL OR (menu_name = ?1 AND pantry_name = ?2)
            ORDER BY menu_name, pantry_name
            "#,
        )
        .bind(menu)
        .bind(pantry)
        .fetch_all(&mut *tx)
        .await?;

        let rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT menu_name, pantry_name, pos, product_id, amount, done FROM shopping_list_items
            WHERE ?1 IS NULL OR (menu_name = ?1 AND pantry_name = ?2)
            "#,
        )
        .bind(menu)
        .bind(pantry)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut lists: Vec<ShoppingList> = lists
            .into_iter()
            .map(|row| ShoppingList::new(row.menu_name, row.pantry_name))
            .collect();
        let index = index_by_key(
            lists
                .iter()
                .map(|l| ShoppingListKey::new(l.menu.clone(), l.pantry.clone())),
        );

        for row in rows {
            let key = ShoppingListKey::new(row.menu_name, row.pantry_name);
            let slot = index.get(&key).copied();
            let pos = to_position(row.pos);
            let product = u32::try_from(row.product_id).ok();
            let (Some(slot), Some(pos), Some(product)) = (slot, pos, product) else {
                tracing::warn!(
                    list = %key,
                    pos = row.pos,
                    "Dropping orphaned shopping list item row"
                );
                continue;
            };
            let item = ShoppingItem {
                product,
                amount: row.amount,
                done: row.done,
            };
            place(&mut lists[slot].items, pos, item);
        }

        Ok(lists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    struct TestContext {
        repo: ShoppingListRepository,
        _temp_dir: TempDir,
    }

    async fn setup_repo() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            repo: ShoppingListRepository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_by_compound_key() {
        let ctx = setup_repo().await;
        let home = ShoppingList::new("week", "home").with_items(vec![
            ShoppingItem::new(4, 2.0),
            ShoppingItem::new(1, 1.0).checked(),
        ]);
        let cabin = ShoppingList::new("week", "cabin").with_items(vec![ShoppingItem::new(9, 1.0)]);

        ctx.repo.set(&home).await.unwrap();
        ctx.repo.set(&cabin).await.unwrap();

        assert_eq!(
            ctx.repo.get(&ShoppingListKey::new("week", "home")).await.unwrap(),
            Some(home)
        );
        assert_eq!(
            ctx.repo.get(&ShoppingListKey::new("week", "cabin")).await.unwrap(),
            Some(cabin)
        );
        assert!(ctx
            .repo
            .get(&ShoppingListKey::new("other", "home"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_replace_and_delete() {
        let ctx = setup_repo().await;
        let key = ShoppingListKey::new("week", "home");
        ctx.repo
            .set(&ShoppingList::new("week", "home").with_items(vec![
                ShoppingItem::new(1, 1.0),
                ShoppingItem::new(2, 1.0),
            ]))
            .await
            .unwrap();
        ctx.repo
            .set(&ShoppingList::new("week", "home"))
            .await
            .unwrap();

        assert!(ctx.repo.get(&key).await.unwrap().unwrap().items.is_empty());
        assert!(ctx.repo.delete(&key).await.unwrap());
        assert!(ctx.repo.list().await.unwrap().is_empty());
    }
}
