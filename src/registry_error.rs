use crate::TypeKey;

/// Boxed error returned by singleton factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The factory for `key` returned an error. The holder stays empty and the
    /// next resolution retries construction.
    #[error("factory for `{key}` failed: {source}")]
    FactoryFailed {
        key: TypeKey,
        #[source]
        source: BoxError,
    },

    /// A resolver reached through the C ABI produced no instance.
    #[error("resolver returned no instance for `{key}`")]
    NoInstance { key: TypeKey },

    /// A key passed across the C ABI was a null pointer with a non-zero length, or
    /// not UTF-8.
    #[error("invalid type key")]
    InvalidKey,

    #[cfg(feature = "dynamic-link")]
    #[error("failed to look up resolver symbol `{symbol}`: {source}")]
    ResolverLookup {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
}

impl RegistryError {
    /// Key of the singleton the failed operation was resolving, if known.
    pub fn key(&self) -> Option<&TypeKey> {
        match self {
            RegistryError::FactoryFailed { key, .. } | RegistryError::NoInstance { key } => {
                Some(key)
            }
            _ => None,
        }
    }
}
