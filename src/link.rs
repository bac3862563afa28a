//! Importing the owning module's resolver.
//!
//! A module that does not own the table links to the owner's exported
//! resolver once, either because the host hands it the function pointer
//! (plugin-entry style, [`install_resolver`]) or by looking the symbol up
//! at run time ([`link_from_process`], [`link_from_library`]). Until a link
//! is installed, [`resolve_shared`] falls back to this module's own
//! [`Registry::global`].

use std::sync::atomic::AtomicPtr;
use std::sync::OnceLock;

use crate::ffi::{self, RawResolveFn};
use crate::{BoxError, InstancePtr, Registry, RegistryError, TypeKey};

/// Resolver imported by this module. Set at most once.
static LINKED_RESOLVER: OnceLock<RawResolveFn> = OnceLock::new();

/// Links this module to a resolver owned by another module.
///
/// Returns `false` if a resolver was already installed; the first one stays.
///
/// # Safety
///
/// `resolve` must honor the [`ffi::module_singleton_resolve`] contract and stay
/// callable for the rest of the process.
pub unsafe fn install_resolver(resolve: RawResolveFn) -> bool {
    let installed = LINKED_RESOLVER.set(resolve).is_ok();
    if installed {
        tracing::debug!("linked foreign singleton resolver");
    } else {
        tracing::warn!("singleton resolver already linked; keeping the first one");
    }
    installed
}

/// The resolver this module has imported, if any.
pub fn linked_resolver() -> Option<RawResolveFn> {
    LINKED_RESOLVER.get().copied()
}

/// Resolves `key` through the linked resolver, or through this module's global
/// registry when nothing is linked.
///
/// This is the path every typed accessor takes.
pub fn resolve_shared<F>(
    key: &TypeKey,
    cache: &AtomicPtr<()>,
    factory: F,
) -> Result<InstancePtr, RegistryError>
where
    F: FnOnce() -> Result<InstancePtr, BoxError>,
{
    match linked_resolver() {
        // SAFETY: `install_resolver` callers vouch for the function.
        Some(resolve) => unsafe { ffi::call_through(resolve, key, Some(cache), factory) },
        None => Registry::global().resolve(key, Some(cache), factory),
    }
}

#[cfg(feature = "dynamic-link")]
mod dynamic {
    use std::path::Path;

    use libloading::Library;

    use super::install_resolver;
    use crate::ffi::{RawResolveFn, RESOLVE_SYMBOL};
    use crate::RegistryError;

    const SYMBOL: &[u8] = b"module_singleton_resolve\0";

    fn lookup_error(source: libloading::Error) -> RegistryError {
        RegistryError::ResolverLookup {
            symbol: RESOLVE_SYMBOL,
            source,
        }
    }

    /// Finds the exported resolver among the symbols already loaded into the process
    /// and installs it.
    ///
    /// The owning module must have been built with `export-resolver` and its symbols
    /// must be globally visible (for executables this usually needs `-rdynamic`).
    /// Only available on unix and windows targets.
    #[cfg(any(unix, windows))]
    pub fn link_from_process() -> Result<RawResolveFn, RegistryError> {
        #[cfg(unix)]
        let library: Library = libloading::os::unix::Library::this().into();
        #[cfg(windows)]
        let library: Library = libloading::os::windows::Library::this()
            .map_err(lookup_error)?
            .into();

        link_library(library)
    }

    /// Loads the owning module from `path` and installs its exported resolver.
    ///
    /// The library is kept loaded for the rest of the process.
    pub fn link_from_library(path: impl AsRef<Path>) -> Result<RawResolveFn, RegistryError> {
        // SAFETY: loading runs the module's initializers; the caller picks the module.
        let library = unsafe { Library::new(path.as_ref()) }.map_err(lookup_error)?;
        link_library(library)
    }

    fn link_library(library: Library) -> Result<RawResolveFn, RegistryError> {
        // SAFETY: the symbol is declared with exactly this signature by `export-resolver`.
        let resolve = unsafe { library.get::<RawResolveFn>(SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(lookup_error)?;
        // Holders and instances outlive every caller, so the owner is never unloaded.
        std::mem::forget(library);
        // SAFETY: the library was leaked above, so the function stays mapped.
        unsafe { install_resolver(resolve) };
        Ok(super::linked_resolver().unwrap_or(resolve))
    }

}

#[cfg(feature = "dynamic-link")]
pub use dynamic::link_from_library;
#[cfg(all(feature = "dynamic-link", any(unix, windows)))]
pub use dynamic::link_from_process;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    static VALUE: &str = "shared";

    #[test]
    fn test_resolve_shared_uses_global_registry_when_unlinked() {
        // Nothing in this crate's unit tests installs a link.
        assert!(linked_resolver().is_none());

        let key = TypeKey::named("link::tests::Unlinked");
        let cache = AtomicPtr::new(std::ptr::null_mut());
        let ptr = resolve_shared(&key, &cache, || Ok(InstancePtr::from_ref(&VALUE))).unwrap();

        assert_eq!(ptr, InstancePtr::from_ref(&VALUE));
        assert_eq!(cache.load(Ordering::Acquire), ptr.as_ptr());
        assert!(Registry::global().is_resolved(&key));
    }
}
