use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ensure_finite, ValidationError};
use crate::provider::{ProviderRegistry, BLANK_PROVIDER};
use crate::record::Record;

/// Number of provider code slots on a product.
pub const MAX_CODES: usize = 3;

/// A purchasable product and where its price comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Product {
    /// Surrogate key; 0 until the store assigns one.
    #[serde(default)]
    pub id: u32,
    pub name: String,
    /// Amount contained in one purchasable unit.
    pub batch_size: f64,
    pub price: f64,
    /// Provider id, empty for the blank provider.
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub codes: [String; MAX_CODES],
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batch_size: 1.0,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn with_batch_size(mut self, batch_size: f64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Sets the provider and its codes. Codes beyond `MAX_CODES` are ignored.
    pub fn with_provider(mut self, provider: impl Into<String>, codes: &[&str]) -> Self {
        self.provider = provider.into();
        self.codes = Default::default();
        for (slot, code) in self.codes.iter_mut().zip(codes) {
            *slot = code.to_string();
        }
        self
    }

    /// Price of one unit of the product (price divided by batch size).
    pub fn unit_price(&self) -> Option<f64> {
        (self.batch_size > 0.0).then(|| self.price / self.batch_size)
    }
}

impl Record for Product {
    type Key = u32;
    const COLLECTION: &'static str = "products";

    fn key(&self) -> u32 {
        self.id
    }

    /// Rejects non-finite numbers. Invalid provider codes are coerced to the
    /// blank provider instead of failing.
    fn prepare(&mut self, providers: &ProviderRegistry) -> Result<(), ValidationError> {
        ensure_finite(Self::COLLECTION, "price", [self.price])?;
        ensure_finite(Self::COLLECTION, "batch_size", [self.batch_size])?;
        if let Err(e) = providers.validate(&self.provider, &self.codes) {
            tracing::warn!(
                product = self.id,
                provider = %self.provider,
                "Invalid provider codes, falling back to blank provider: {}",
                e
            );
            self.provider = BLANK_PROVIDER.to_string();
            self.codes = Default::default();
        }
        Ok(())
    }

    fn needs_key(&self) -> bool {
        self.id == 0
    }

    fn assign_random_key(&mut self) {
        self.id = rand::rng().random_range(1..=u32::MAX);
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{}): {:.2} per {}", self.name, self.id, self.price, self.batch_size)?;
        if self.provider != BLANK_PROVIDER {
            write!(f, " via {}", self.provider)?;
        }
        Ok(())
    }
}
