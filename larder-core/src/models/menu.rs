//! Menus: a named plan of days, each day a list of meals, each meal a list of
//! dishes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ensure_finite, ValidationError};
use crate::provider::ProviderRegistry;
use crate::record::Record;

/// A recipe served in some amount (portions).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Dish {
    pub recipe: String,
    pub amount: f64,
}

impl Dish {
    pub fn new(recipe: impl Into<String>, amount: f64) -> Self {
        Self {
            recipe: recipe.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Meal {
    pub name: String,
    #[serde(default)]
    pub dishes: Vec<Dish>,
}

impl Meal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dishes: Vec::new(),
        }
    }

    pub fn with_dishes(mut self, dishes: Vec<Dish>) -> Self {
        self.dishes = dishes;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Day {
    pub name: String,
    #[serde(default)]
    pub meals: Vec<Meal>,
}

impl Day {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meals: Vec::new(),
        }
    }

    pub fn with_meals(mut self, meals: Vec<Meal>) -> Self {
        self.meals = meals;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Menu {
    pub name: String,
    #[serde(default)]
    pub days: Vec<Day>,
}

impl Menu {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            days: Vec::new(),
        }
    }

    pub fn with_days(mut self, days: Vec<Day>) -> Self {
        self.days = days;
        self
    }

    /// Every dish of the menu in day, meal, dish order.
    pub fn dishes(&self) -> impl Iterator<Item = &Dish> {
        self.days
            .iter()
            .flat_map(|day| day.meals.iter())
            .flat_map(|meal| meal.dishes.iter())
    }
}

impl Record for Menu {
    type Key = String;
    const COLLECTION: &'static str = "menus";

    fn key(&self) -> String {
        self.name.clone()
    }

    fn prepare(&mut self, _providers: &ProviderRegistry) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName {
                collection: Self::COLLECTION,
            });
        }
        ensure_finite(Self::COLLECTION, "amount", self.dishes().map(|d| d.amount))
    }
}

impl fmt::Display for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        for day in &self.days {
            writeln!(f, "{}", day.name)?;
            for meal in &day.meals {
                writeln!(f, "  {}", meal.name)?;
                for dish in &meal.dishes {
                    writeln!(f, "    - {} ({})", dish.recipe, dish.amount)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week() -> Menu {
        Menu::new("Week 1").with_days(vec![
            Day::new("Monday").with_meals(vec![
                Meal::new("Breakfast").with_dishes(vec![Dish::new("Porridge", 2.0)]),
                Meal::new("Dinner").with_dishes(vec![
                    Dish::new("Soup", 4.0),
                    Dish::new("Bread", 1.0),
                ]),
            ]),
            Day::new("Tuesday"),
        ])
    }

    #[test]
    fn test_menu_dishes_in_order() {
        let week = week();
        let recipes: Vec<&str> = week.dishes().map(|d| d.recipe.as_str()).collect();
        assert_eq!(recipes, vec!["Porridge", "Soup", "Bread"]);
    }

    #[test]
    fn test_menu_requires_name() {
        let mut menu = Menu::new("");
        assert!(menu.prepare(&ProviderRegistry::new()).is_err());
    }

    #[test]
    fn test_menu_display() {
        let output = format!("{}", week());
        assert!(output.contains("Week 1"));
        assert!(output.contains("  Dinner"));
        assert!(output.contains("    - Soup (4)"));
    }

    #[test]
    fn test_menu_json_roundtrip() {
        let menu = week();
        let json = serde_json::to_string(&menu).unwrap();
        let parsed: Menu = serde_json::from_str(&json).unwrap();
        assert_eq!(menu, parsed);
    }
}
