//! Larder Core Library
//!
//! Entity models and the record contract shared by every Larder storage
//! backend.

pub mod error;
pub mod models;
pub mod positional;
pub mod provider;
pub mod record;

pub use error::ValidationError;
pub use models::{
    Day, Dish, Ingredient, Meal, Menu, Pantry, PantryItem, Product, Recipe, ShoppingItem,
    ShoppingList, ShoppingListKey, DEFAULT_PANTRY,
};
pub use provider::{
    Charset, CodeFormat, Provider, ProviderError, ProviderRegistry, BLANK_PROVIDER,
};
pub use record::Record;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
