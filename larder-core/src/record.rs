//! The record contract every stored entity implements.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use crate::error::ValidationError;
use crate::provider::ProviderRegistry;

/// An entity that lives in exactly one named collection.
///
/// Both storage backends are written against this trait: the key identifies
/// the entity inside its collection, and `prepare` runs before every write.
pub trait Record:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Primary key of the entity within its collection.
    type Key: Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync;

    /// Collection name, used in errors and log output.
    const COLLECTION: &'static str;

    fn key(&self) -> Self::Key;

    /// Validates and normalizes the entity in place before it is written.
    fn prepare(&mut self, _providers: &ProviderRegistry) -> Result<(), ValidationError> {
        Ok(())
    }

    /// True when the store must generate a key before inserting.
    fn needs_key(&self) -> bool {
        false
    }

    /// Draws a fresh random key. Callers retry on collision.
    fn assign_random_key(&mut self) {}
}
