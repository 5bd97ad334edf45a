//! Shopping lists computed from a menu against a pantry.
//!
//! A list is identified by the menu it shops for and the pantry it was
//! computed against, so the same menu can have one list per pantry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::pantry::DEFAULT_PANTRY;
use crate::error::{ensure_finite, ValidationError};
use crate::provider::ProviderRegistry;
use crate::record::Record;

/// Compound key of a shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShoppingListKey {
    pub menu: String,
    pub pantry: String,
}

impl ShoppingListKey {
    /// An empty pantry name refers to the default pantry.
    pub fn new(menu: impl Into<String>, pantry: impl Into<String>) -> Self {
        let pantry = pantry.into();
        Self {
            menu: menu.into(),
            pantry: if pantry.is_empty() {
                DEFAULT_PANTRY.to_string()
            } else {
                pantry
            },
        }
    }
}

impl fmt::Display for ShoppingListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.menu, self.pantry)
    }
}

/// Parses `menu/pantry`, or a bare `menu` for the default pantry.
impl FromStr for ShoppingListKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (menu, pantry) = s.rsplit_once('/').unwrap_or((s, ""));
        if menu.is_empty() {
            return Err(ValidationError::MissingMenu);
        }
        Ok(Self::new(menu, pantry))
    }
}

/// A product still to buy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShoppingItem {
    pub product: u32,
    pub amount: f64,
    /// Whether the item has been bought.
    #[serde(default)]
    pub done: bool,
}

impl ShoppingItem {
    pub fn new(product: u32, amount: f64) -> Self {
        Self {
            product,
            amount,
            done: false,
        }
    }

    pub fn checked(mut self) -> Self {
        self.done = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShoppingList {
    pub menu: String,
    #[serde(default)]
    pub pantry: String,
    #[serde(default)]
    pub items: Vec<ShoppingItem>,
}

impl ShoppingList {
    pub fn new(menu: impl Into<String>, pantry: impl Into<String>) -> Self {
        Self {
            menu: menu.into(),
            pantry: pantry.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<ShoppingItem>) -> Self {
        self.items = items;
        self
    }

    /// Items not yet bought.
    pub fn open_items(&self) -> impl Iterator<Item = &ShoppingItem> {
        self.items.iter().filter(|item| !item.done)
    }
}

impl Record for ShoppingList {
    type Key = ShoppingListKey;
    const COLLECTION: &'static str = "shopping_lists";

    fn key(&self) -> ShoppingListKey {
        ShoppingListKey::new(self.menu.clone(), self.pantry.clone())
    }

    fn prepare(&mut self, _providers: &ProviderRegistry) -> Result<(), ValidationError> {
        if self.menu.is_empty() {
            return Err(ValidationError::MissingMenu);
        }
        if self.pantry.is_empty() {
            self.pantry = DEFAULT_PANTRY.to_string();
        }
        ensure_finite(Self::COLLECTION, "amount", self.items.iter().map(|i| i.amount))
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.key())?;
        for item in &self.items {
            let mark = if item.done { 'x' } else { ' ' };
            writeln!(f, "  [{}] #{}: {}", mark, item.product, item.amount)?;
        }
        Ok(())
    }
}
