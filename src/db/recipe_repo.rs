use sqlx::{SqliteConnection, SqlitePool};

use larder_core::positional::{place, to_position};
use larder_core::{Ingredient, Recipe};

use super::index_by_key;

#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct NameRow {
    name: String,
}

#[derive(sqlx::FromRow)]
struct IngredientRow {
    recipe_name: String,
    pos: i64,
    product_id: i64,
    amount: f64,
}

impl RecipeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Recipe>, sqlx::Error> {
        self.load(None).await
    }

    pub async fn get(&self, name: &str) -> Result<Option<Recipe>, sqlx::Error> {
        Ok(self.load(Some(name)).await?.into_iter().next())
    }

    /// Replaces the recipe and all of its ingredient rows.
    pub async fn set(&self, recipe: &Recipe) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        tracing::trace!(recipe = %recipe.name, "Replacing recipe rows");
        Self::delete_children(&mut *tx, &recipe.name).await?;

        sqlx::query("INSERT INTO recipes (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
            .bind(&recipe.name)
            .execute(&mut *tx)
            .await?;

        for (pos, ingredient) in recipe.ingredients.iter().enumerate() {
            sqlx::query(
                "INSERT INTO recipe_ingredients (recipe_name, pos, product_id, amount) VALUES (?, ?, ?, ?)",
            )
            .bind(&recipe.name)
            .bind(pos as i64)
            .bind(i64::from(ingredient.product))
            .bind(ingredient.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Returns false when no recipe has this name.
    pub async fn delete(&self, name: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        tracing::trace!(recipe = %name, "Deleting recipe rows");
        Self::delete_children(&mut *tx, name).await?;
        let result = sqlx::query("DELETE FROM recipes WHERE name = ?")
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
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_name = ?")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn load(&self, name: Option<&str>) -> Result<Vec<Recipe>, sqlx::Error> {
        tracing::trace!(recipe = ?name, "Loading recipes");

        let mut tx = self.pool.begin().await?;

        let names: Vec<NameRow> =
            sqlx::query_as("SELECT name FROM recipes WHERE ?1 IS NULL OR name = ?1 ORDER BY name")
                .bind(name)
                .fetch_all(&mut *tx)
                .await?;

        let rows: Vec<IngredientRow> = sqlx::query_as(
            "SELECT recipe_name, pos, product_id, amount FROM recipe_ingredients WHERE ?1 IS NULL OR recipe_name = ?1",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut recipes: Vec<Recipe> = names.into_iter().map(|row| Recipe::new(row.name)).collect();
        let index = index_by_key(recipes.iter().map(|r| r.name.clone()));

        for row in rows {
            let slot = index.get(&row.recipe_name).copied();
            let pos = to_position(row.pos);
            let product = u32::try_from(row.product_id).ok();
            let (Some(slot), Some(pos), Some(product)) = (slot, pos, product) else {
                tracing::warn!(
                    recipe = %row.recipe_name,
                    pos = row.pos,
                    "Dropping orphaned ingredient row"
                );
                continue;
            };
            place(
                &mut recipes[slot].ingredients,
                pos,
                Ingredient::new(product, row.amount),
            );
        }

        Ok(recipes)
    }
}
