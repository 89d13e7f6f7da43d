use thiserror::Error;

/// Error type for the resource layer.
///
/// Transport and API failures bubble up from `restive-api` unchanged;
/// envelope normalization and adaptation are lenient by design and
/// contribute no error variants.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] restive_api::Error),
}

impl CoreError {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api(e) => e.is_not_found(),
        }
    }
}
