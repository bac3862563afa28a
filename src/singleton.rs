//! Core trait giving a type `get_instance()`-style access.
//!
//! This module provides the `Singleton` trait with default implementations of the
//! double-checked access path: a lock-free read of the module-local cache, then a
//! call into the shared resolver on a miss.
//!
//! Implementors supply the key, the two module-local statics, and construction.
//! The [`define_singleton!`](crate::define_singleton) macro writes all of that.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::OnceLock;

use crate::{resolve_shared, BoxError, InstancePtr, RegistryError, SingletonHandle, TypeKey};

/// A type with exactly one instance per process.
///
/// Each module that implements the trait for the same type keeps its own
/// `cache()` and `storage()` statics. Only the module whose factory wins the race
/// in the shared registry ever fills its `storage()`; everyone else reads that
/// instance through the registry and caches its address.
pub trait Singleton: Sized + Send + Sync + 'static {
    /// Stable identity shared by every module that defines this singleton.
    const KEY: TypeKey;

    /// Module-local cache of the resolved address.
    ///
    /// This method must be implemented to provide access to a `static` slot
    /// initialized to null.
    fn cache() -> &'static AtomicPtr<()>;

    /// Module-local storage for the instance if this module constructs it.
    fn storage() -> &'static OnceLock<Self>;

    /// Builds the instance. Called at most once per successful resolution.
    fn construct() -> Result<Self, BoxError>;

    /// Returns the process-wide instance, constructing it on first use.
    ///
    /// # Errors
    ///
    /// [`RegistryError::FactoryFailed`] if `construct` fails. A later call tries
    /// again.
    fn try_get_instance() -> Result<&'static Self, RegistryError> {
        if let Some(cached) = NonNull::new(Self::cache().load(Ordering::Acquire)) {
            // SAFETY: the cache only ever holds an address resolved for `Self::KEY`.
            return Ok(unsafe { cached.cast::<Self>().as_ref() });
        }

        let ptr = resolve_shared(&Self::KEY, Self::cache(), || {
            let value = Self::construct()?;
            let stored = Self::storage().get_or_init(|| value);
            Ok(InstancePtr::from_ref(stored))
        })?;
        Self::cache().store(ptr.as_ptr(), Ordering::Release);

        // SAFETY: the registry returns the address produced for `Self::KEY`.
        Ok(unsafe { ptr.as_ref::<Self>() })
    }

    /// Returns the process-wide instance, constructing it on first use.
    ///
    /// # Panics
    ///
    /// Panics if construction fails.
    fn get_instance() -> &'static Self {
        match Self::try_get_instance() {
            Ok(instance) => instance,
            Err(err) => panic!("failed to resolve singleton `{}`: {err}", Self::KEY),
        }
    }

    /// Like [`get_instance`](Singleton::get_instance), wrapped in a shared handle
    /// that never drops the singleton.
    fn get_instance_handle() -> SingletonHandle<Self> {
        SingletonHandle::new(Self::get_instance())
    }

    /// Fallible form of [`get_instance_handle`](Singleton::get_instance_handle).
    fn try_get_instance_handle() -> Result<SingletonHandle<Self>, RegistryError> {
        Self::try_get_instance().map(SingletonHandle::new)
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
