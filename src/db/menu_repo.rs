//! Menus mapped onto four tables.
//!
//! ```text
//! menus                   (name)
//! menu_days               (menu_name, pos, name)
//! menu_day_meals          (menu_name, day_pos, pos, name)
//! menu_day_meal_recipes   (menu_name, day_pos, meal_pos, pos, recipe_name, amount)
//! ```
//!
//! Every row carries the menu name and its position at each ancestor level, so
//! a level is read as one flat result set and slotted back into the tree by
//! position. Writes delete the deepest level first and insert top-down, so
//! the foreign keys hold at every statement.

use sqlx::{SqliteConnection, SqlitePool};

use larder_core::positional::{place, to_position};
use larder_core::{Day, Dish, Meal, Menu};

use super::index_by_key;

#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct NameRow {
    name: String,
}

#[derive(sqlx::FromRow)]
struct DayRow {
    menu_name: String,
    pos: i64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct MealRow {
    menu_name: String,
    day_pos: i64,
    pos: i64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct DishRow {
    menu_name: String,
    day_pos: i64,
    meal_pos: i64,
    pos: i64,
    recipe_name: String,
    amount: f64,
}

impl MenuRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Menu>, sqlx::Error> {
        self.load(None).await
    }

    pub async fn get(&self, name: &str) -> Result<Option<Menu>, sqlx::Error> {
        Ok(self.load(Some(name)).await?.into_iter().next())
    }

    /// Replaces the menu and every day, meal and dish row beneath it.
    pub async fn set(&self, menu: &Menu) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        tracing::trace!(menu = %menu.name, "Replacing menu rows");
        Self::delete_children(&mut *tx, &menu.name).await?;

        sqlx::query("INSERT INTO menus (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
            .bind(&menu.name)
            .execute(&mut *tx)
            .await?;

        for (day_pos, day) in menu.days.iter().enumerate() {
            sqlx::query("INSERT INTO menu_days (menu_name, pos, name) VALUES (?, ?, ?)")
                .bind(&menu.name)
                .bind(day_pos as i64)
                .bind(&day.name)
                .execute(&mut *tx)
                .await?;
        }

        for (day_pos, day) in menu.days.iter().enumerate() {
            for (meal_pos, meal) in day.meals.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO menu_day_meals (menu_name, day_pos, pos, name) VALUES (?, ?, ?, ?)",
                )
                .bind(&menu.name)
                .bind(day_pos as i64)
                .bind(meal_pos as i64)
                .bind(&meal.name)
                .execute(&mut *tx)
                .await?;
            }
        }

        for (day_pos, day) in menu.days.iter().enumerate() {
            for (meal_pos, meal) in day.meals.iter().enumerate() {
                for (pos, dish) in meal.dishes.iter().enumerate() {
                    sqlx::query(
                        r#"
                        INSERT INTO menu_day_meal_recipes (menu_name, day_pos, meal_pos, pos, recipe_name, amount)
                        VALUES (?, ?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(&menu.name)
                    .bind(day_pos as i64)
                    .bind(meal_pos as i64)
                    .bind(pos as i64)
                    .bind(&dish.recipe)
                    .bind(dish.amount)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await
    }

    /// Returns false when no menu has this name.
    pub async fn delete(&self, name: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        tracing::trace!(menu = %name, "Deleting menu rows");
        Self::delete_children(&mut *tx, name).await?;
        let result = sqlx::query("DELETE FROM menus WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    /// Deletes dishes, then meals, then days of a menu.
    async fn delete_children(conn: &mut SqliteConnection, name: &str) -> Result<(), sqlx::Error> {
        for table in ["menu_day_meal_recipes", "menu_day_meals", "menu_days"] {
            sqlx::query(&format!("DELETE FROM {} WHERE menu_name = ?", table))
                .bind(name)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    async fn load(&self, name: Option<&str>) -> Result<Vec<Menu>, sqlx::Error> {
        tracing::trace!(menu = ?name, "Loading menus");

        // One read transaction, so every table is read from the same snapshot
        let mut tx = self.pool.begin().await?;

        let names: Vec<NameRow> =
            sqlx::query_as("SELECT name FROM menus WHERE ?1 IS NULL OR name = ?1 ORDER BY name")
                .bind(name)
                .fetch_all(&mut *tx)
                .await?;

        let days: Vec<DayRow> = sqlx::query_as(
            "SELECT menu_name, pos, name FROM menu_days WHERE ?1 IS NULL OR menu_name = ?1",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;

        let meals: Vec<MealRow> = sqlx::query_as(
            "SELECT menu_name, day_pos, pos, name FROM menu_day_meals WHERE ?1 IS NULL OR menu_name = ?1",
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;

        let dishes: Vec<DishRow> = sqlx::query_as(
            r#"
            SELECT menu_name, day_pos, meal_pos, pos, recipe_name, amount
            FROM menu_day_meal_recipes
            WHERE ?1 IS NULL OR menu_name = ?1
            "#,
        )
        .bind(name)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut menus: Vec<Menu> = names.into_iter().map(|row| Menu::new(row.name)).collect();
        assemble(&mut menus, days, meals, dishes);
        Ok(menus)
    }
}

/// Slots day, meal and dish rows into their menus by key and position.
///
/// Days are placed first so that meals and dishes find their ancestors
/// regardless of row order. A row whose ancestor slot does not exist is
/// dropped.
fn assemble(menus: &mut [Menu], days: Vec<DayRow>, meals: Vec<MealRow>, dishes: Vec<DishRow>) {
    let index = index_by_key(menus.iter().map(|m| m.name.clone()));

    for row in days {
        let slot = index.get(&row.menu_name).copied();
        let (Some(slot), Some(pos)) = (slot, to_position(row.pos)) else {
            tracing::warn!(menu = %row.menu_name, pos = row.pos, "Dropping orphaned day row");
            continue;
        };
        place(&mut menus[slot].days, pos, Day::new(row.name));
    }

    for row in meals {
        let slot = index.get(&row.menu_name).copied();
        let day = day_mut(menus, slot, row.day_pos);
        let (Some(day), Some(pos)) = (day, to_position(row.pos)) else {
            tracing::warn!(
                menu = %row.menu_name,
                day_pos = row.day_pos,
                pos = row.pos,
                "Dropping orphaned meal row"
            );
            continue;
        };
        place(&mut day.meals, pos, Meal::new(row.name));
    }

    for row in dishes {
        let slot = index.get(&row.menu_name).copied();
        let meal = meal_mut(menus, slot, row.day_pos, row.meal_pos);
        let (Some(meal), Some(pos)) = (meal, to_position(row.pos)) else {
            tracing::warn!(
                menu = %row.menu_name,
                day_pos = row.day_pos,
                meal_pos = row.meal_pos,
                pos = row.pos,
                "Dropping orphaned dish row"
            );
            continue;
        };
        place(&mut meal.dishes, pos, Dish::new(row.recipe_name, row.amount));
    }
}

fn day_mut(menus: &mut [Menu], slot: Option<usize>, day_pos: i64) -> Option<&mut Day> {
    let (slot, day_pos) = (slot?, to_position(day_pos)?);
    menus.get_mut(slot)?.days.get_mut(day_pos)
}

fn meal_mut(
    menus: &mut [Menu],
    slot: Option<usize>,
    day_pos: i64,
    meal_pos: i64,
) -> Option<&mut Meal> {
    let meal_pos = to_position(meal_pos)?;
    day_mut(menus, slot, day_pos)?.meals.get_mut(meal_pos)
}
