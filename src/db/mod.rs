//! Relational store backed by SQLite.
//!
//! Nested lists are spread over child tables whose rows carry an explicit
//! `pos` column, one table per nesting level. See `migrations/` for the
//! schema.

mod menu_repo;
mod pantry_repo;
mod product_repo;
mod recipe_repo;
mod shopping_list_repo;

pub use menu_repo::MenuRepository;
pub use pantry_repo::PantryRepository;
pub use product_repo::ProductRepository;
pub use recipe_repo::RecipeRepository;
pub use shopping_list_repo::ShoppingListRepository;

use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use larder_core::{
    Menu, Pantry, Product, ProviderRegistry, Recipe, Record, ShoppingList, ShoppingListKey,
};

use crate::error::{Result, StoreError};
use crate::store::Collection;

/// Open the database at `path`, creating it if needed, and run migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Maps each root key to its index in the loaded result.
pub(crate) fn index_by_key<K: Eq + Hash>(keys: impl Iterator<Item = K>) -> HashMap<K, usize> {
    keys.enumerate().map(|(i, key)| (key, i)).collect()
}

/// Relational store holding all five collections.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
    providers: Arc<ProviderRegistry>,
    products: ProductRepository,
    recipes: RecipeRepository,
    menus: MenuRepository,
    pantries: PantryRepository,
    shopping_lists: ShoppingListRepository,
}

impl SqlStore {
    pub async fn open(path: &Path, providers: Arc<ProviderRegistry>) -> Result<Self> {
        let pool = init_db(path).await?;
        tracing::info!("Opened relational store at {}", path.display());
        Ok(Self::new(pool, providers))
    }

    pub fn new(pool: SqlitePool, providers: Arc<ProviderRegistry>) -> Self {
        Self {
            products: ProductRepository::new(pool.clone()),
            recipes: RecipeRepository::new(pool.clone()),
            menus: MenuRepository::new(pool.clone()),
            pantries: PantryRepository::new(pool.clone()),
            shopping_lists: ShoppingListRepository::new(pool.clone()),
            pool,
            providers,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for open connections to finish, then closes the pool.
    pub async fn close(&self) -> Result<()> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        self.pool.close().await;
        tracing::debug!("Closed relational store");
        Ok(())
    }

    fn prepare<T: Record>(&self, value: &mut T) -> Result<()> {
        value.prepare(&self.providers)?;
        Ok(())
    }
}

fn found<T: Record>(deleted: bool, key: &T::Key) -> Result<()> {
    if deleted {
        Ok(())
    } else {
        Err(StoreError::not_found(T::COLLECTION, key))
    }
}

impl Collection<Product> for SqlStore {
    async fn list(&self) -> Result<Vec<Product>> {
        Ok(self.products.list().await?)
    }

    async fn lookup(&self, key: &u32) -> Result<Option<Product>> {
        Ok(self.products.get(*key).await?)
    }

    async fn set(&self, mut value: Product) -> Result<u32> {
        self.prepare(&mut value)?;
        Ok(self.products.set(&value).await?)
    }

    async fn delete(&self, key: &u32) -> Result<()> {
        found::<Product>(self.products.delete(*key).await?, key)
    }
}

impl Collection<Recipe> for SqlStore {
    async fn list(&self) -> Result<Vec<Recipe>> {
        Ok(self.recipes.list().await?)
    }

    async fn lookup(&self, key: &String) -> Result<Option<Recipe>> {
        Ok(self.recipes.get(key).await?)
    }

    async fn set(&self, mut value: Recipe) -> Result<String> {
        self.prepare(&mut value)?;
        self.recipes.set(&value).await?;
        Ok(value.key())
    }

    async fn delete(&self, key: &String) -> Result<()> {
        found::<Recipe>(self.recipes.delete(key).await?, key)
    }
}

impl Collection<Menu> for SqlStore {
    async fn list(&self) -> Result<Vec<Menu>> {
        Ok(self.menus.list().await?)
    }

    async fn lookup(&self, key: &String) -> Result<Option<Menu>> {
        Ok(self.menus.get(key).await?)
    }

    async fn set(&self, mut value: Menu) -> Result<String> {
        self.prepare(&mut value)?;
        self.menus.set(&value).await?;
        Ok(value.key())
    }

    async fn delete(&self, key: &String) -> Result<()> {
        found::<Menu>(self.menus.delete(key).await?, key)
    }
}

impl Collection<Pantry> for SqlStore {
    async fn list(&self) -> Result<Vec<Pantry>> {
        Ok(self.pantries.list().await?)
    }

    async fn lookup(&self, key: &String) -> Result<Option<Pantry>> {
        Ok(self.pantries.get(key).await?)
    }

    async fn set(&self, mut value: Pantry) -> Result<String> {
        self.prepare(&mut value)?;
        self.pantries.set(&value).await?;
        Ok(value.key())
    }

    async fn delete(&self, key: &String) -> Result<()> {
        found::<Pantry>(self.pantries.delete(key).await?, key)
    }
}

impl Collection<ShoppingList> for SqlStore {
    async fn list(&self) -> Result<Vec<ShoppingList>> {
        Ok(self.shopping_lists.list().await?)
    }

    async fn lookup(&self, key: &ShoppingListKey) -> Result<Option<ShoppingList>> {
        Ok(self.shopping_lists.get(key).await?)
    }

    async fn set(&self, mut value: ShoppingList) -> Result<ShoppingListKey> {
        self.prepare(&mut value)?;
        self.shopping_lists.set(&value).await?;
        Ok(value.key())
    }

    async fn delete(&self, key: &ShoppingListKey) -> Result<()> {
        found::<ShoppingList>(self.shopping_lists.delete(key).await?, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::{CodeFormat, ValidationError};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let pool = init_db(&db_path).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        for table in [
            "products",
            "recipes",
            "recipe_ingredients",
            "menus",
            "menu_days",
            "menu_day_meals",
            "menu_day_meal_recipes",
            "pantries",
            "pantry_items",
            "shopping_lists",
            "shopping_list_items",
        ] {
            assert!(table_names.contains(&table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_init_db_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        init_db(&db_path).await.unwrap().close().await;
        init_db(&db_path).await.unwrap();
    }

    #[test]
    fn test_index_by_key() {
        let index = index_by_key(["a", "b", "c"].into_iter());
        assert_eq!(index.get("b"), Some(&1));
        assert_eq!(index.get("z"), None);
    }

    async fn open_store(dir: &Path) -> SqlStore {
        let providers = Arc::new(ProviderRegistry::new().with(CodeFormat::new("grocer", 1)));
        SqlStore::open(&dir.join("larder.db"), providers).await.unwrap()
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(temp_dir.path()).await;

        let err = Collection::<Recipe>::delete(&store, &"Nothing".to_string())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_set_validates_before_writing() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(temp_dir.path()).await;

        let err = store.set(Menu::new("")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyName { .. })
        ));
        let menus = Collection::<Menu>::list(&store).await.unwrap();
        assert!(menus.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_cleared() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(temp_dir.path()).await;

        let id = store
            .set(Product::new("Tea").with_provider("nobody", &["1", "", ""]))
            .await
            .unwrap();

        let product = Collection::<Product>::lookup(&store, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.provider, "");
        assert_eq!(product.codes, [String::new(), String::new(), String::new()]);
    }

    #[tokio::test]
    async fn test_operations_after_close_fail() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(temp_dir.path()).await;

        store.close().await.unwrap();

        let result = Collection::<Pantry>::list(&store).await;
        assert!(matches!(result, Err(StoreError::Closed)));
        assert!(matches!(store.close().await, Err(StoreError::Closed)));
    }
}
