//! Price provider registry.
//!
//! Providers are the external sources a product's price is scraped from. The
//! storage layer only needs to know whether a product's codes are valid for its
//! provider, so a provider here is reduced to an id and a code validator.
//!
//! The registry is an explicit object built once at startup and shared by
//! handle with every component that validates products.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::models::MAX_CODES;

/// Identifier of the blank provider: a product without a price source.
pub const BLANK_PROVIDER: &str = "";

/// Errors raised while validating provider codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("unknown provider '{0}'")]
    Unknown(String),

    #[error("provider '{provider}' expects {expected} code(s), got {found}")]
    Arity {
        provider: String,
        expected: usize,
        found: usize,
    },

    #[error("provider '{provider}' rejects code '{code}'")]
    Format { provider: String, code: String },
}

/// A source of product prices, reduced to its code rules.
pub trait Provider: Send + Sync {
    fn id(&self) -> &str;

    /// Checks the product codes (always `MAX_CODES` slots, unused ones empty).
    fn validate(&self, codes: &[String]) -> Result<(), ProviderError>;
}

/// Characters a code may consist of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    Digits,
    Alphanumeric,
    /// Any non-whitespace character.
    #[default]
    Token,
}

impl Charset {
    fn accepts(self, code: &str) -> bool {
        match self {
            Charset::Digits => code.chars().all(|c| c.is_ascii_digit()),
            Charset::Alphanumeric => code.chars().all(|c| c.is_ascii_alphanumeric()),
            Charset::Token => !code.chars().any(char::is_whitespace),
        }
    }
}

/// A provider whose codes are a fixed number of tokens over a charset.
///
/// The first `arity` code slots must be filled and well-formed; the
/// remaining slots must be empty.
#[derive(Debug, Clone)]
pub struct CodeFormat {
    id: String,
    arity: usize,
    charset: Charset,
}

impl CodeFormat {
    pub fn new(id: impl Into<String>, arity: usize) -> Self {
        Self {
            id: id.into(),
            arity: arity.min(MAX_CODES),
            charset: Charset::Token,
        }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }
}

impl Provider for CodeFormat {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self, codes: &[String]) -> Result<(), ProviderError> {
        let found = codes.iter().filter(|c| !c.is_empty()).count();
        let filled_prefix = codes.iter().take(self.arity).all(|c| !c.is_empty());
        if found != self.arity || !filled_prefix {
            return Err(ProviderError::Arity {
                provider: self.id.clone(),
                expected: self.arity,
                found,
            });
        }

        if let Some(bad) = codes
            .iter()
            .take(self.arity)
            .find(|c| !self.charset.accepts(c))
        {
            return Err(ProviderError::Format {
                provider: self.id.clone(),
                code: bad.clone(),
            });
        }

        Ok(())
    }
}

/// Named providers known to this process.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Box<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider, replacing any earlier one with the same id.
    pub fn register(&mut self, provider: impl Provider + 'static) -> &mut Self {
        self.providers
            .insert(provider.id().to_string(), Box::new(provider));
        self
    }

    pub fn with(mut self, provider: impl Provider + 'static) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, id: &str) -> Option<&dyn Provider> {
        self.providers.get(id).map(|p| p.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Validates codes against the named provider.
    ///
    /// The blank provider accepts only empty codes.
    pub fn validate(&self, id: &str, codes: &[String]) -> Result<(), ProviderError> {
        if id == BLANK_PROVIDER {
            let found = codes.iter().filter(|c| !c.is_empty()).count();
            if found > 0 {
                return Err(ProviderError::Arity {
                    provider: BLANK_PROVIDER.to_string(),
                    expected: 0,
                    found,
                });
            }
            return Ok(());
        }

        self.get(id)
            .ok_or_else(|| ProviderError::Unknown(id.to_string()))?
            .validate(codes)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
