use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ensure_finite, ValidationError};
use crate::provider::ProviderRegistry;
use crate::record::Record;

/// An amount of a product, referenced by product id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Ingredient {
    pub product: u32,
    pub amount: f64,
}

impl Ingredient {
    pub fn new(product: u32, amount: f64) -> Self {
        Self { product, amount }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ingredients: Vec::new(),
        }
    }

    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients = ingredients;
        self
    }
}

impl Record for Recipe {
    type Key = String;
    const COLLECTION: &'static str = "recipes";

    fn key(&self) -> String {
        self.name.clone()
    }

    fn prepare(&mut self, _providers: &ProviderRegistry) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName {
                collection: Self::COLLECTION,
            });
        }
        ensure_finite(
            Self::COLLECTION,
            "amount",
            self.ingredients.iter().map(|i| i.amount),
        )
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for ingredient in &self.ingredients {
            writeln!(f, "  - {} x #{}", ingredient.amount, ingredient.product)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_requires_name() {
        let mut recipe = Recipe::new("");
        assert_eq!(
            recipe.prepare(&ProviderRegistry::new()),
            Err(ValidationError::EmptyName {
                collection: "recipes"
            })
        );
    }

    #[test]
    fn test_recipe_display() {
        let recipe = Recipe::new("Pancakes").with_ingredients(vec![Ingredient::new(7, 2.0)]);
        let output = format!("{}", recipe);
        assert!(output.contains("Pancakes"));
        assert!(output.contains("2 x #7"));
    }

    #[test]
    fn test_recipe_json_missing_ingredients() {
        let parsed: Recipe = serde_json::from_str(r#"{"name":"Toast"}"#).unwrap();
        assert_eq!(parsed, Recipe::new("Toast"));
    }
}
