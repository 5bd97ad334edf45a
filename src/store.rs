//! The collection contract shared by both backends, and the `Store` handle
//! that picks one at construction.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use larder_core::{Menu, Pantry, Product, ProviderRegistry, Recipe, Record, ShoppingList};

use crate::db::SqlStore;
use crate::error::Result;
use crate::files::FileStore;

/// CRUD over one collection of records.
///
/// `set` validates and normalizes the value, replaces any stored record with
/// the same key and returns the key it was stored under. `delete` fails with
/// `StoreError::NotFound` when nothing has the key.
#[allow(async_fn_in_trait)]
pub trait Collection<T: Record> {
    async fn list(&self) -> Result<Vec<T>>;

    async fn lookup(&self, key: &T::Key) -> Result<Option<T>>;

    async fn set(&self, value: T) -> Result<T::Key>;

    async fn delete(&self, key: &T::Key) -> Result<()>;
}

/// A store holding every collection.
pub trait Storage:
    Collection<Product>
    + Collection<Recipe>
    + Collection<Menu>
    + Collection<Pantry>
    + Collection<ShoppingList>
{
}

impl<S> Storage for S where
    S: Collection<Product>
        + Collection<Recipe>
        + Collection<Menu>
        + Collection<Pantry>
        + Collection<ShoppingList>
{
}

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// One JSON file per collection in a directory.
    Files { data_dir: PathBuf },
    /// A SQLite database file.
    Sqlite { database_path: PathBuf },
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Files { data_dir } => write!(f, "files at {}", data_dir.display()),
            Backend::Sqlite { database_path } => write!(f, "sqlite at {}", database_path.display()),
        }
    }
}

/// Either backend behind one type.
#[derive(Debug)]
pub enum Store {
    Files(FileStore),
    Sqlite(SqlStore),
}

impl Store {
    pub async fn open(backend: &Backend, providers: Arc<ProviderRegistry>) -> Result<Self> {
        match backend {
            Backend::Files { data_dir } => Ok(Store::Files(FileStore::open(data_dir, providers)?)),
            Backend::Sqlite { database_path } => {
                Ok(Store::Sqlite(SqlStore::open(database_path, providers).await?))
            }
        }
    }

    pub async fn list<T: Record>(&self) -> Result<Vec<T>>
    where
        Self: Collection<T>,
    {
        Collection::<T>::list(self).await
    }

    pub async fn lookup<T: Record>(&self, key: &T::Key) -> Result<Option<T>>
    where
        Self: Collection<T>,
    {
        Collection::<T>::lookup(self, key).await
    }

    pub async fn set<T: Record>(&self, value: T) -> Result<T::Key>
    where
        Self: Collection<T>,
    {
        Collection::<T>::set(self, value).await
    }

    pub async fn delete<T: Record>(&self, key: &T::Key) -> Result<()>
    where
        Self: Collection<T>,
    {
        Collection::<T>::delete(self, key).await
    }

    /// Flushes and releases the backend. Later operations fail with
    /// `StoreError::Closed`.
    pub async fn close(&self) -> Result<()> {
        match self {
            Store::Files(store) => store.close(),
            Store::Sqlite(store) => store.close().await,
        }
    }
}

impl<T: Record> Collection<T> for Store
where
    FileStore: Collection<T>,
    SqlStore: Collection<T>,
{
    async fn list(&self) -> Result<Vec<T>> {
        match self {
            Store::Files(store) => Collection::<T>::list(store).await,
            Store::Sqlite(store) => Collection::<T>::list(store).await,
        }
    }

    async fn lookup(&self, key: &T::Key) -> Result<Option<T>> {
        match self {
            Store::Files(store) => Collection::<T>::lookup(store, key).await,
            Store::Sqlite(store) => Collection::<T>::lookup(store, key).await,
        }
    }

    async fn set(&self, value: T) -> Result<T::Key> {
        match self {
            Store::Files(store) => Collection::<T>::set(store, value).await,
            Store::Sqlite(store) => Collection::<T>::set(store, value).await,
        }
    }

    async fn delete(&self, key: &T::Key) -> Result<()> {
        match self {
            Store::Files(store) => Collection::<T>::delete(store, key).await,
            Store::Sqlite(store) => Collection::<T>::delete(store, key).await,
        }
    }
}

/// Number of records copied per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub products: usize,
    pub recipes: usize,
    pub menus: usize,
    pub pantries: usize,
    pub shopping_lists: usize,
}

impl CopySummary {
    pub fn total(&self) -> usize {
        self.products + self.recipes + self.menus + self.pantries + self.shopping_lists
    }
}

impl fmt::Display for CopySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} products, {} recipes, {} menus, {} pantries, {} shopping lists",
            self.products, self.recipes, self.menus, self.pantries, self.shopping_lists
        )
    }
}

async fn copy_collection<T, S, D>(from: &S, to: &D) -> Result<usize>
where
    T: Record,
    S: Collection<T>,
    D: Collection<T>,
{
    let records = from.list().await?;
    let count = records.len();
    for record in records {
        to.set(record).await?;
    }
    tracing::debug!("Copied {} {}", count, T::COLLECTION);
    Ok(count)
}

/// Copies every record of every collection from one store into another.
///
/// Records keep their keys, product ids included. Records already in the
/// target with the same key are replaced.
pub async fn copy_all<S: Storage, D: Storage>(from: &S, to: &D) -> Result<CopySummary> {
    Ok(CopySummary {
        products: copy_collection::<Product, _, _>(from, to).await?,
        recipes: copy_collection::<Recipe, _, _>(from, to).await?,
        menus: copy_collection::<Menu, _, _>(from, to).await?,
        pantries: copy_collection::<Pantry, _, _>(from, to).await?,
        shopping_lists: copy_collection::<ShoppingList, _, _>(from, to).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use larder_core::{
        CodeFormat, Day, Dish, Ingredient, Meal, PantryItem, ShoppingItem, ShoppingListKey,
        ValidationError, DEFAULT_PANTRY,
    };
    use tempfile::TempDir;

    struct TestContext {
        backend: Backend,
        _temp_dir: TempDir,
    }

    fn providers() -> Arc<ProviderRegistry> {
        Arc::new(ProviderRegistry::new().with(CodeFormat::new("grocer", 1)))
    }

    fn files() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        TestContext {
            backend: Backend::Files {
                data_dir: temp_dir.path().join("data"),
            },
            _temp_dir: temp_dir,
        }
    }

    fn sqlite() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        TestContext {
            backend: Backend::Sqlite {
                database_path: temp_dir.path().join("larder.db"),
            },
            _temp_dir: temp_dir,
        }
    }

    impl TestContext {
        async fn open(&self) -> Store {
            Store::open(&self.backend, providers()).await.unwrap()
        }
    }

    fn week() -> Menu {
        Menu::new("Week").with_days(vec![
            Day::new("Mon").with_meals(vec![
                Meal::new("Breakfast").with_dishes(vec![Dish::new("Porridge", 1.0)]),
                Meal::new("Dinner")
                    .with_dishes(vec![Dish::new("Stew", 4.0), Dish::new("Bread", 1.0)]),
            ]),
            Day::new("Tue"),
            Day::new("Wed").with_meals(vec![Meal::new("Lunch")]),
        ])
    }

    async fn round_trip(ctx: TestContext) {
        let store = ctx.open().await;

        let id = store
            .set(Product::new("Oats").with_price(2.5).with_provider("grocer", &["77"]))
            .await
            .unwrap();
        assert_ne!(id, 0);
        let recipe = Recipe::new("Porridge").with_ingredients(vec![Ingredient::new(id, 0.1)]);
        store.set(recipe.clone()).await.unwrap();
        store.set(week()).await.unwrap();

        let product = store.lookup::<Product>(&id).await.unwrap().unwrap();
        assert_eq!(product.codes[0], "77");
        assert_eq!(
            store.lookup::<Recipe>(&"Porridge".to_string()).await.unwrap(),
            Some(recipe)
        );
        assert_eq!(
            store.lookup::<Menu>(&"Week".to_string()).await.unwrap(),
            Some(week())
        );
    }

    async fn replace(ctx: TestContext) {
        let store = ctx.open().await;
        let (eggs, milk) = (1, 2);

        store
            .set(Pantry::new("p1").with_items(vec![
                PantryItem::new(eggs, 12.0),
                PantryItem::new(milk, 2.0),
            ]))
            .await
            .unwrap();
        store
            .set(Pantry::new("p1").with_items(vec![PantryItem::new(eggs, 6.0)]))
            .await
            .unwrap();

        let pantry = store
            .lookup::<Pantry>(&"p1".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pantry.items, vec![PantryItem::new(eggs, 6.0)]);

        let mut shorter = week();
        shorter.days.truncate(1);
        shorter.days[0].meals.truncate(1);
        store.set(shorter.clone()).await.unwrap();
        assert_eq!(
            store.lookup::<Menu>(&"Week".to_string()).await.unwrap(),
            Some(shorter)
        );
    }

    async fn durability(ctx: TestContext) {
        let list = ShoppingList::new("Week", "")
            .with_items(vec![ShoppingItem::new(1, 2.0), ShoppingItem::new(2, 1.0).checked()]);
        let key = ShoppingListKey::new("Week", DEFAULT_PANTRY);

        let store = ctx.open().await;
        store.set(week()).await.unwrap();
        assert_eq!(store.set(list).await.unwrap(), key);
        store.close().await.unwrap();

        let reopened = ctx.open().await;
        let stored = reopened.lookup::<ShoppingList>(&key).await.unwrap().unwrap();
        assert_eq!(stored.pantry, DEFAULT_PANTRY);
        assert_eq!(stored.open_items().count(), 1);
        assert_eq!(
            reopened.lookup::<Menu>(&"Week".to_string()).await.unwrap(),
            Some(week())
        );
    }

    async fn delete(ctx: TestContext) {
        let store = ctx.open().await;
        store.set(Recipe::new("Toast")).await.unwrap();

        store.delete::<Recipe>(&"Toast".to_string()).await.unwrap();
        assert!(store.list::<Recipe>().await.unwrap().is_empty());
        assert!(store
            .lookup::<Recipe>(&"Toast".to_string())
            .await
            .unwrap()
            .is_none());

        let err = store
            .delete::<Recipe>(&"Toast".to_string())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = store.delete::<Product>(&12345).await.unwrap_err();
        assert!(err.is_not_found());
    }

    async fn validation(ctx: TestContext) {
        let store = ctx.open().await;

        let err = store.set(Recipe::new("")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyName { .. })
        ));
        let err = store.set(ShoppingList::new("", "home")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingMenu)
        ));
    }

    async fn non_finite(ctx: TestContext) {
        let store = ctx.open().await;
        store
            .set(Pantry::new("home").with_items(vec![PantryItem::new(1, 3.0)]))
            .await
            .unwrap();

        let err = store
            .set(Pantry::new("home").with_items(vec![PantryItem::new(1, f64::NAN)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::NonFinite { .. })
        ));
        let err = store
            .set(Product::new("Gold").with_price(f64::INFINITY))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::NonFinite { .. })
        ));
        store.close().await.unwrap();

        let reopened = ctx.open().await;
        let pantry = reopened
            .lookup::<Pantry>(&"home".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pantry.items, vec![PantryItem::new(1, 3.0)]);
        assert!(reopened.list::<Product>().await.unwrap().is_empty());
    }

    async fn closed(ctx: TestContext) {
        let store = ctx.open().await;
        store.close().await.unwrap();

        let result = store.list::<Menu>().await;
        assert!(matches!(result, Err(StoreError::Closed)));
    }

    macro_rules! on_both_backends {
        ($($scenario:ident),* $(,)?) => {
            mod files_backend {
                $(
                    #[tokio::test]
                    async fn $scenario() {
                        super::$scenario(super::files()).await;
                    }
                )*
            }

            mod sqlite_backend {
                $(
                    #[tokio::test]
                    async fn $scenario() {
                        super::$scenario(super::sqlite()).await;
                    }
                )*
            }
        };
    }

    on_both_backends!(
        round_trip,
        replace,
        durability,
        delete,
        validation,
        non_finite,
        closed
    );

    #[tokio::test]
    async fn test_copy_all_between_backends() {
        let source_ctx = files();
        let target_ctx = sqlite();
        let source = source_ctx.open().await;
        let target = target_ctx.open().await;

        let id = source.set(Product::new("Salt")).await.unwrap();
        source
            .set(Recipe::new("Brine").with_ingredients(vec![Ingredient::new(id, 1.0)]))
            .await
            .unwrap();
        source.set(week()).await.unwrap();
        source.set(Pantry::new("home")).await.unwrap();
        source.set(ShoppingList::new("Week", "home")).await.unwrap();

        let summary = copy_all(&source, &target).await.unwrap();
        assert_eq!(
            summary,
            CopySummary {
                products: 1,
                recipes: 1,
                menus: 1,
                pantries: 1,
                shopping_lists: 1,
            }
        );
        assert_eq!(summary.total(), 5);

        let copied = target.lookup::<Product>(&id).await.unwrap();
        assert_eq!(copied.map(|p| p.name), Some("Salt".to_string()));
        assert_eq!(
            target.lookup::<Menu>(&"Week".to_string()).await.unwrap(),
            Some(week())
        );
    }

    #[test]
    fn test_backend_display() {
        let backend = Backend::Sqlite {
            database_path: PathBuf::from("/tmp/larder.db"),
        };
        assert_eq!(backend.to_string(), "sqlite at /tmp/larder.db");
    }
}
