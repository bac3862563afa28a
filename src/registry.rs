//! The process-wide table of singleton holders.
//!
//! Every typed accessor in every module ends up in [`Registry::resolve`] on the
//! one registry that owns the table. The registry hands out one [`Holder`] per
//! [`TypeKey`] and serializes first construction under that holder's own lock,
//! so unrelated types construct concurrently while callers of the same type wait
//! for a single factory run.
//!
//! # Examples
//!
//! ```
//! use module_singleton::{InstancePtr, Registry, TypeKey};
//!
//! static LOGGER: &str = "stderr";
//!
//! let registry = Registry::new();
//! let key = TypeKey::named("docs::Logger");
//! let ptr = registry
//!     .resolve(&key, None, || Ok(InstancePtr::from_ref(&LOGGER)))
//!     .unwrap();
//! assert_eq!(unsafe { *ptr.as_ref::<&str>() }, "stderr");
//! ```

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::{BoxError, RegistryError, RegistryEvent, TypeKey};

/// The process registry. Built once by `LazyLock`, never through itself.
static GLOBAL_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives every [`RegistryEvent`] the registry emits. It runs on
/// the resolving thread after the table lock has been released.
pub type TraceCallback = dyn Fn(&RegistryEvent) + Send + Sync + 'static;

// -------------------------------------------------------------------------------------------------
// Instance pointer
// -------------------------------------------------------------------------------------------------

/// Opaque, non-null address of a singleton instance with `'static` storage.
///
/// The registry never dereferences it. Only the typed accessor that built the
/// instance knows the concrete type behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstancePtr(NonNull<()>);

// SAFETY: an `InstancePtr` is only ever created from a `&'static T` with `T: Sync`
// (or from the C ABI under the same contract), so sharing the address is sound.
unsafe impl Send for InstancePtr {}
unsafe impl Sync for InstancePtr {}

impl InstancePtr {
    /// Wraps the address of a `'static` instance.
    pub fn from_ref<T: Sync + 'static>(instance: &'static T) -> Self {
        InstancePtr(NonNull::from(instance).cast())
    }

    /// Wraps a raw address received across the C ABI. Returns `None` for null.
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr.cast()).map(InstancePtr)
    }

    pub(crate) fn from_slot(slot: &AtomicPtr<()>) -> Option<Self> {
        NonNull::new(slot.load(Ordering::Acquire)).map(InstancePtr)
    }

    pub fn as_ptr(self) -> *mut () {
        self.0.as_ptr()
    }

    /// Reinterprets the address as a reference to `T`.
    ///
    /// # Safety
    ///
    /// The pointer must have been produced from a `&'static T` of exactly this
    /// type. A key collision between two types breaks this precondition.
    pub unsafe fn as_ref<T: 'static>(self) -> &'static T {
        unsafe { self.0.cast::<T>().as_ref() }
    }
}

// -------------------------------------------------------------------------------------------------
// Holder
// -------------------------------------------------------------------------------------------------

/// Per-key record pairing the instance address with its construction lock.
///
/// The instance moves from null to set exactly once, always while `lock` is held,
/// and is never cleared.
#[derive(Debug)]
pub struct Holder {
    instance: AtomicPtr<()>,
    lock: Mutex<()>,
}

impl Holder {
    fn new() -> Self {
        Holder {
            instance: AtomicPtr::new(std::ptr::null_mut()),
            lock: Mutex::new(()),
        }
    }

    /// The resolved instance, or `None` while construction has not succeeded yet.
    ///
    /// Never blocks.
    pub fn instance(&self) -> Option<InstancePtr> {
        InstancePtr::from_slot(&self.instance)
    }
}

// -------------------------------------------------------------------------------------------------
// Registry
// -------------------------------------------------------------------------------------------------

/// Mapping from [`TypeKey`] to [`Holder`].
///
/// Use [`Registry::global`] for the process registry. Standalone registries from
/// [`Registry::new`] are fully isolated; their holders are leaked like the global
/// ones.
pub struct Registry {
    table: Mutex<HashMap<TypeKey, &'static Holder>>,
    trace: Mutex<Option<Arc<TraceCallback>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            table: Mutex::new(HashMap::new()),
            trace: Mutex::new(None),
        }
    }

    /// The registry owned by this module.
    ///
    /// A module that has linked a foreign resolver (see [`crate::install_resolver`])
    /// still has its own global registry; it is simply never consulted by
    /// [`crate::resolve_shared`].
    pub fn global() -> &'static Registry {
        &GLOBAL_REGISTRY
    }

    // ---------------------------------------------------------------------------------------------
    // Tracing
    // ---------------------------------------------------------------------------------------------

    /// Sets a tracing callback invoked for every event this registry emits.
    ///
    /// The callback may call back into the registry, including for the same key,
    /// since no registry lock is held while it runs.
    pub fn set_trace_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        *self.trace.lock() = Some(Arc::new(callback));
    }

    /// Clears the tracing callback.
    pub fn clear_trace_callback(&self) {
        *self.trace.lock() = None;
    }

    fn emit_event(&self, event: RegistryEvent) {
        let callback = self.trace.lock().clone();
        if let Some(callback) = callback {
            callback(&event);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Holders
    // ---------------------------------------------------------------------------------------------

    /// Returns the holder for `key`, inserting an empty one on first request.
    ///
    /// Every caller gets the same `&'static Holder` for the same key.
    pub fn find_or_create_holder(&self, key: &TypeKey) -> &'static Holder {
        let (holder, created) = {
            let mut table = self.table.lock();
            Self::holder_in(&mut table, key)
        };
        if created {
            self.holder_created(key);
        }
        holder
    }

    fn holder_in(
        table: &mut HashMap<TypeKey, &'static Holder>,
        key: &TypeKey,
    ) -> (&'static Holder, bool) {
        if let Some(holder) = table.get(key.as_str()) {
            return (*holder, false);
        }
        let holder: &'static Holder = Box::leak(Box::new(Holder::new()));
        table.insert(key.clone().into_owned(), holder);
        (holder, true)
    }

    fn holder_created(&self, key: &TypeKey) {
        tracing::debug!(key = %key, "created singleton holder");
        self.emit_event(RegistryEvent::HolderCreated { key: key.clone() });
    }

    /// Resolves the instance for `key`, running `factory` if nobody has built it yet.
    ///
    /// `cache` is the caller's own slot. If it is already set the table is not
    /// searched. On success the resolved address is published into it.
    ///
    /// The factory runs on the calling thread while this key's holder lock is
    /// held. Calls for other keys proceed in parallel. Resolving the same key
    /// again from inside its own factory deadlocks.
    ///
    /// # Errors
    ///
    /// [`RegistryError::FactoryFailed`] when the factory returns an error. The
    /// holder stays empty and the next call runs the factory again. A panicking
    /// factory unwinds through this call with the same effect.
    pub fn resolve<F>(
        &self,
        key: &TypeKey,
        cache: Option<&AtomicPtr<()>>,
        factory: F,
    ) -> Result<InstancePtr, RegistryError>
    where
        F: FnOnce() -> Result<InstancePtr, BoxError>,
    {
        let (holder, created) = {
            let mut table = self.table.lock();
            if let Some(ptr) = cache.and_then(InstancePtr::from_slot) {
                drop(table);
                tracing::trace!(key = %key, "singleton cache hit");
                self.emit_event(RegistryEvent::CacheHit { key: key.clone() });
                return Ok(ptr);
            }
            Self::holder_in(&mut table, key)
        };
        if created {
            self.holder_created(key);
        }

        let (ptr, constructed) = {
            let _construction = holder.lock.lock();
            match holder.instance() {
                Some(ptr) => (ptr, false),
                None => match factory() {
                    Ok(ptr) => {
                        holder.instance.store(ptr.as_ptr(), Ordering::Release);
                        (ptr, true)
                    }
                    Err(source) => {
                        drop(_construction);
                        tracing::warn!(key = %key, error = %source, "singleton factory failed");
                        self.emit_event(RegistryEvent::ConstructionFailed { key: key.clone() });
                        return Err(RegistryError::FactoryFailed {
                            key: key.clone(),
                            source,
                        });
                    }
                },
            }
        };
        if constructed {
            tracing::debug!(key = %key, "constructed singleton");
            self.emit_event(RegistryEvent::Constructed { key: key.clone() });
        }

        if let Some(cache) = cache {
            let _table = self.table.lock();
            cache.store(ptr.as_ptr(), Ordering::Release);
        }

        self.emit_event(RegistryEvent::Resolved { key: key.clone() });
        Ok(ptr)
    }

    // ---------------------------------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------------------------------

    /// Whether a holder exists for `key`. A failed construction still leaves one.
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.table.lock().contains_key(key.as_str())
    }

    /// Whether `key` has a constructed instance.
    pub fn is_resolved(&self, key: &TypeKey) -> bool {
        let holder = self.table.lock().get(key.as_str()).copied();
        holder.is_some_and(|holder| holder.instance().is_some())
    }

    /// Number of holders in the table.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("holders", &self.len()).finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Process registry shortcuts
// -------------------------------------------------------------------------------------------------

/// Resolves `key` in this module's global registry without a cache slot.
pub fn resolve<F>(key: &TypeKey, factory: F) -> Result<InstancePtr, RegistryError>
where
    F: FnOnce() -> Result<InstancePtr, BoxError>,
{
    Registry::global().resolve(key, None, factory)
}

/// Whether the global registry holds a holder for `key`.
pub fn contains(key: &TypeKey) -> bool {
    Registry::global().contains(key)
}

/// Whether the global registry has constructed `key`.
pub fn is_resolved(key: &TypeKey) -> bool {
    Registry::global().is_resolved(key)
}

/// Sets the tracing callback of the global registry.
///
/// # Example
/// ```rust
/// use module_singleton::set_trace_callback;
///
/// set_trace_callback(|event| println!("[registry-trace] {event}"));
/// # module_singleton::clear_trace_callback();
/// ```
pub fn set_trace_callback(callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
    Registry::global().set_trace_callback(callback);
}

/// Clears the tracing callback of the global registry.
pub fn clear_trace_callback() {
    Registry::global().clear_trace_callback();
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
