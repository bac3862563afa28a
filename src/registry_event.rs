use crate::TypeKey;

/// Events emitted by a registry while resolving singletons.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// The `Clone` derive allows callbacks to store or forward events if needed.
///
/// # Examples
///
/// ```rust
/// use module_singleton::{RegistryEvent, TypeKey};
///
/// let event = RegistryEvent::Constructed { key: TypeKey::named("app::Logger") };
/// assert_eq!(event.to_string(), "constructed { key: app::Logger }");
/// ```
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A holder was inserted into the table for a key seen for the first time.
    HolderCreated { key: TypeKey },

    /// The caller's cache slot was already set; the table was not searched.
    CacheHit { key: TypeKey },

    /// The factory ran and its instance was stored in the holder.
    Constructed { key: TypeKey },

    /// The factory returned an error. The holder is still empty.
    ConstructionFailed { key: TypeKey },

    /// A resolution finished and the instance was published to the caller.
    Resolved { key: TypeKey },
}

impl RegistryEvent {
    pub fn key(&self) -> &TypeKey {
        match self {
            RegistryEvent::HolderCreated { key }
            | RegistryEvent::CacheHit { key }
            | RegistryEvent::Constructed { key }
            | RegistryEvent::ConstructionFailed { key }
            | RegistryEvent::Resolved { key } => key,
        }
    }
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::HolderCreated { key } => write!(f, "holder created {{ key: {key} }}"),
            RegistryEvent::CacheHit { key } => write!(f, "cache hit {{ key: {key} }}"),
            RegistryEvent::Constructed { key } => write!(f, "constructed {{ key: {key} }}"),
            RegistryEvent::ConstructionFailed { key } => {
                write!(f, "construction failed {{ key: {key} }}")
            }
            RegistryEvent::Resolved { key } => write!(f, "resolved {{ key: {key} }}"),
        }
    }
}
