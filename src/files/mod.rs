//! Flat-file document store.
//!
//! Each collection is kept in memory and mirrored to one JSON array file in
//! the data directory:
//! ```text
//! <data_dir>/
//! ├── products.json
//! ├── recipes.json
//! ├── menus.json
//! ├── pantries.json
//! └── shoppingLists.json
//! ```
//!
//! Every collection has its own lock, so a write to one collection never
//! waits on another.

mod collection;

pub use collection::JsonCollection;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use larder_core::{Menu, Pantry, Product, ProviderRegistry, Recipe, Record, ShoppingList};

use crate::error::{Result, StoreError};
use crate::store::Collection;

pub const PRODUCTS_FILE: &str = "products.json";
pub const RECIPES_FILE: &str = "recipes.json";
pub const MENUS_FILE: &str = "menus.json";
pub const PANTRIES_FILE: &str = "pantries.json";
pub const SHOPPING_LISTS_FILE: &str = "shoppingLists.json";

/// Document store holding all five collections.
#[derive(Debug)]
pub struct FileStore {
    data_dir: PathBuf,
    providers: Arc<ProviderRegistry>,
    products: JsonCollection<Product>,
    recipes: JsonCollection<Recipe>,
    menus: JsonCollection<Menu>,
    pantries: JsonCollection<Pantry>,
    shopping_lists: JsonCollection<ShoppingList>,
    closed: AtomicBool,
}

impl FileStore {
    /// Opens the store, loading every collection file in `data_dir`.
    ///
    /// Missing files are empty collections. If any file fails to load, the
    /// returned error lists every failing file.
    pub fn open(data_dir: impl Into<PathBuf>, providers: Arc<ProviderRegistry>) -> Result<Self> {
        let data_dir = data_dir.into();

        let loaded = (
            JsonCollection::load(data_dir.join(PRODUCTS_FILE)),
            JsonCollection::load(data_dir.join(RECIPES_FILE)),
            JsonCollection::load(data_dir.join(MENUS_FILE)),
            JsonCollection::load(data_dir.join(PANTRIES_FILE)),
            JsonCollection::load(data_dir.join(SHOPPING_LISTS_FILE)),
        );

        match loaded {
            (Ok(products), Ok(recipes), Ok(menus), Ok(pantries), Ok(shopping_lists)) => {
                tracing::info!("Opened document store in {}", data_dir.display());
                Ok(Self {
                    data_dir,
                    providers,
                    products,
                    recipes,
                    menus,
                    pantries,
                    shopping_lists,
                    closed: AtomicBool::new(false),
                })
            }
            (products, recipes, menus, pantries, shopping_lists) => {
                let failures: Vec<StoreError> = [
                    products.err(),
                    recipes.err(),
                    menus.err(),
                    pantries.err(),
                    shopping_lists.err(),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(StoreError::Load(failures))
            }
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn products(&self) -> &JsonCollection<Product> {
        &self.products
    }

    pub fn recipes(&self) -> &JsonCollection<Recipe> {
        &self.recipes
    }

    pub fn menus(&self) -> &JsonCollection<Menu> {
        &self.menus
    }

    pub fn pantries(&self) -> &JsonCollection<Pantry> {
        &self.pantries
    }

    pub fn shopping_lists(&self) -> &JsonCollection<ShoppingList> {
        &self.shopping_lists
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Flushes every collection to disk and refuses further operations.
    ///
    /// A failing collection does not stop the others from being flushed.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }

        let failures: Vec<StoreError> = [
            self.products.flush(),
            self.recipes.flush(),
            self.menus.flush(),
            self.pantries.flush(),
            self.shopping_lists.flush(),
        ]
        .into_iter()
        .filter_map(|flushed| flushed.err())
        .collect();
        if !failures.is_empty() {
            return Err(StoreError::Flush(failures));
        }

        tracing::debug!("Closed document store in {}", self.data_dir.display());
        Ok(())
    }
}

/// Maps a record type to the collection that holds it.
pub trait Holds<T> {
    fn collection(&self) -> &JsonCollection<T>;
}

impl Holds<Product> for FileStore {
    fn collection(&self) -> &JsonCollection<Product> {
        &self.products
    }
}

impl Holds<Recipe> for FileStore {
    fn collection(&self) -> &JsonCollection<Recipe> {
        &self.recipes
    }
}

impl Holds<Menu> for FileStore {
    fn collection(&self) -> &JsonCollection<Menu> {
        &self.menus
    }
}

impl Holds<Pantry> for FileStore {
    fn collection(&self) -> &JsonCollection<Pantry> {
        &self.pantries
    }
}

impl Holds<ShoppingList> for FileStore {
    fn collection(&self) -> &JsonCollection<ShoppingList> {
        &self.shopping_lists
    }
}

impl<T: Record> Collection<T> for FileStore
where
    FileStore: Holds<T>,
{
    async fn list(&self) -> Result<Vec<T>> {
        self.ensure_open()?;
        Ok(Holds::<T>::collection(self).list())
    }

    async fn lookup(&self, key: &T::Key) -> Result<Option<T>> {
        self.ensure_open()?;
        Ok(Holds::<T>::collection(self).lookup(key))
    }

    async fn set(&self, value: T) -> Result<T::Key> {
        self.ensure_open()?;
        Holds::<T>::collection(self).set(value, &self.providers)
    }

    async fn delete(&self, key: &T::Key) -> Result<()> {
        self.ensure_open()?;
        Holds::<T>::collection(self).delete(key)
    }
}
