use clap::{Args, ValueEnum};
use std::fmt;

use larder::{Collection, Store};
use larder_core::{Menu, Pantry, Product, Recipe, Record, ShoppingList, ShoppingListKey};

use super::OutputFormat;

#[derive(Clone, Copy, ValueEnum)]
pub enum CollectionName {
    Products,
    Recipes,
    Menus,
    Pantries,
    ShoppingLists,
}

#[derive(Args)]
pub struct ListCommand {
    /// Collection to print
    #[arg(value_enum)]
    pub collection: CollectionName,

    /// Output format
    #[arg(long, short, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

impl ListCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        match self.collection {
            CollectionName::Products => print_all::<Product>(store, &self.format).await,
            CollectionName::Recipes => print_all::<Recipe>(store, &self.format).await,
            CollectionName::Menus => print_all::<Menu>(store, &self.format).await,
            CollectionName::Pantries => print_all::<Pantry>(store, &self.format).await,
            CollectionName::ShoppingLists => {
                print_all::<ShoppingList>(store, &self.format).await
            }
        }
    }
}

async fn print_all<T>(
    store: &Store,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>>
where
    T: Record + fmt::Display,
    Store: Collection<T>,
{
    let records = store.list::<T>().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No {} found.", T::COLLECTION);
            }
            for record in &records {
                println!("{}", record.to_string().trim_end());
            }
        }
    }

    Ok(())
}

#[derive(Args)]
pub struct DeleteCommand {
    /// Collection to delete from
    #[arg(value_enum)]
    pub collection: CollectionName,

    /// Product id, entity name, or `menu/pantry` for a shopping list
    pub key: String,
}

impl DeleteCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        match self.collection {
            CollectionName::Products => {
                let id: u32 = self
                    .key
                    .parse()
                    .map_err(|_| format!("Invalid product id '{}'", self.key))?;
                delete::<Product>(store, id).await
            }
            CollectionName::Recipes => delete::<Recipe>(store, self.key.clone()).await,
            CollectionName::Menus => delete::<Menu>(store, self.key.clone()).await,
            CollectionName::Pantries => delete::<Pantry>(store, self.key.clone()).await,
            CollectionName::ShoppingLists => {
                let key: ShoppingListKey = self.key.parse()?;
                delete::<ShoppingList>(store, key).await
            }
        }
    }
}

async fn delete<T>(store: &Store, key: T::Key) -> Result<(), Box<dyn std::error::Error>>
where
    T: Record,
    Store: Collection<T>,
{
    store.delete::<T>(&key).await?;
    println!("Deleted {} '{}'", T::COLLECTION, key);
    Ok(())
}
