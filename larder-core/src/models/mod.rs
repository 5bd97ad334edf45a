mod menu;
mod pantry;
mod product;
mod recipe;
mod shopping_list;

pub use menu::{Day, Dish, Meal, Menu};
pub use pantry::{Pantry, PantryItem, DEFAULT_PANTRY};
pub use product::{Product, MAX_CODES};
pub use recipe::{Ingredient, Recipe};
pub use shopping_list::{ShoppingItem, ShoppingList, ShoppingListKey};
