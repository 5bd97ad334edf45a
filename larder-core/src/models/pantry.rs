use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ensure_finite, ValidationError};
use crate::provider::ProviderRegistry;
use crate::record::Record;

/// Name given to a pantry that was stored without one.
pub const DEFAULT_PANTRY: &str = "default";

/// Stock of one product in a pantry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PantryItem {
    pub product: u32,
    pub amount: f64,
}

impl PantryItem {
    pub fn new(product: u32, amount: f64) -> Self {
        Self { product, amount }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Pantry {
    pub name: String,
    #[serde(default)]
    pub items: Vec<PantryItem>,
}

impl Pantry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<PantryItem>) -> Self {
        self.items = items;
        self
    }

    /// Total stock of a product across all items.
    pub fn stock(&self, product: u32) -> f64 {
        self.items
            .iter()
            .filter(|item| item.product == product)
            .map(|item| item.amount)
            .sum()
    }
}

impl Record for Pantry {
    type Key = String;
    const COLLECTION: &'static str = "pantries";

    fn key(&self) -> String {
        self.name.clone()
    }

    fn prepare(&mut self, _providers: &ProviderRegistry) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            self.name = DEFAULT_PANTRY.to_string();
        }
        ensure_finite(Self::COLLECTION, "amount", self.items.iter().map(|i| i.amount))
    }
}

impl fmt::Display for Pantry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for item in &self.items {
            writeln!(f, "  #{}: {}", item.product, item.amount)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_defaults() {
        let mut pantry = Pantry::new("");
        pantry.prepare(&ProviderRegistry::new()).unwrap();
        assert_eq!(pantry.name, DEFAULT_PANTRY);
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        let mut pantry = Pantry::new("home")
            .with_items(vec![PantryItem::new(1, 2.0), PantryItem::new(2, f64::NAN)]);
        assert_eq!(
            pantry.prepare(&ProviderRegistry::new()),
            Err(ValidationError::NonFinite {
                collection: "pantries",
                field: "amount"
            })
        );
    }

    #[test]
    fn test_stock_sums_items() {
        let pantry = Pantry::new("home").with_items(vec![
            PantryItem::new(1, 2.0),
            PantryItem::new(2, 5.0),
            PantryItem::new(1, 0.5),
        ]);
        assert_eq!(pantry.stock(1), 2.5);
        assert_eq!(pantry.stock(3), 0.0);
    }
}
