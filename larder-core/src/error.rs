//! Validation error types.

use thiserror::Error;

/// Reasons an entity is refused before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{collection} name must not be empty")]
    EmptyName { collection: &'static str },

    #[error("shopping list must reference a menu")]
    MissingMenu,

    #[error("{collection} {field} must be a finite number")]
    NonFinite {
        collection: &'static str,
        field: &'static str,
    },
}

/// Rejects NaN and infinities, which neither backend can store.
pub(crate) fn ensure_finite(
    collection: &'static str,
    field: &'static str,
    values: impl IntoIterator<Item = f64>,
) -> Result<(), ValidationError> {
    if values.into_iter().all(f64::is_finite) {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { collection, field })
    }
}
