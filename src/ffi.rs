//! The C-ABI resolution entry point shared between modules.
//!
//! Exactly one module in the process builds this crate with the
//! `export-resolver` feature. That module exports [`module_singleton_resolve`]
//! unmangled and owns the table; every other module imports the function (see
//! [`crate::link`]) and calls through it.

use std::any::Any;
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicPtr;

use crate::{BoxError, InstancePtr, Registry, RegistryError, TypeKey};

/// Name of the exported resolver symbol.
pub const RESOLVE_SYMBOL: &str = "module_singleton_resolve";

/// Factory callback carried across the C ABI. Returns null on failure.
pub type RawFactory = unsafe extern "C" fn(ctx: *mut c_void) -> *mut c_void;

/// Signature of [`module_singleton_resolve`].
pub type RawResolveFn = unsafe extern "C" fn(
    key_ptr: *const u8,
    key_len: usize,
    cache: *const AtomicPtr<c_void>,
    factory: RawFactory,
    ctx: *mut c_void,
) -> *mut c_void;

/// Resolves a singleton in this module's global registry on behalf of any module.
///
/// `cache` may be null. A zero `key_len` names the empty key whatever `key_ptr` is.
/// Returns null when the key is invalid, the factory returns
/// null, or anything inside the registry panics; no unwind ever crosses the ABI.
///
/// # Safety
///
/// - `key_ptr` must point to `key_len` readable bytes.
/// - `cache`, if non-null, must point to an `AtomicPtr` that outlives the call.
/// - `factory(ctx)` must be safe to call once on this thread and must return null
///   or the address of an instance that lives for the rest of the process.
#[cfg_attr(feature = "export-resolver", unsafe(no_mangle))]
pub unsafe extern "C" fn module_singleton_resolve(
    key_ptr: *const u8,
    key_len: usize,
    cache: *const AtomicPtr<c_void>,
    factory: RawFactory,
    ctx: *mut c_void,
) -> *mut c_void {
    let key = match unsafe { key_from_raw(key_ptr, key_len) } {
        Ok(key) => key,
        Err(err) => {
            tracing::warn!(error = %err, "rejected singleton key from foreign module");
            return std::ptr::null_mut();
        }
    };
    // SAFETY: `AtomicPtr<c_void>` and `AtomicPtr<()>` share one layout.
    let cache = unsafe { cache.cast::<AtomicPtr<()>>().as_ref() };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        Registry::global().resolve(&key, cache, || {
            // SAFETY: the caller vouches for `factory` and `ctx`.
            let raw = unsafe { factory(ctx) };
            InstancePtr::from_raw(raw).ok_or_else(|| -> BoxError {
                format!("foreign factory for `{key}` returned null; the calling module holds its error")
                    .into()
            })
        })
    }));

    match outcome {
        Ok(Ok(ptr)) => ptr.as_ptr().cast(),
        Ok(Err(err)) => {
            tracing::debug!(key = %key, error = %err, "no instance for foreign module");
            std::ptr::null_mut()
        }
        Err(_) => {
            tracing::error!(key = %key, "panic while resolving singleton across the module boundary");
            std::ptr::null_mut()
        }
    }
}

unsafe fn key_from_raw(key_ptr: *const u8, key_len: usize) -> Result<TypeKey, RegistryError> {
    if key_len == 0 {
        return Ok(TypeKey::from(String::new()));
    }
    if key_ptr.is_null() {
        return Err(RegistryError::InvalidKey);
    }
    let bytes = unsafe { std::slice::from_raw_parts(key_ptr, key_len) };
    let tag = std::str::from_utf8(bytes).map_err(|_| RegistryError::InvalidKey)?;
    Ok(TypeKey::from(tag.to_owned()))
}

// -------------------------------------------------------------------------------------------------
// Rust factories over the C ABI
// -------------------------------------------------------------------------------------------------

/// Context carried through `ctx` while a Rust factory is called from a resolver
/// that may live in another module.
struct FactoryCall<F> {
    factory: Option<F>,
    error: Option<BoxError>,
    panic: Option<Box<dyn Any + Send + 'static>>,
}

unsafe extern "C" fn trampoline<F>(ctx: *mut c_void) -> *mut c_void
where
    F: FnOnce() -> Result<InstancePtr, BoxError>,
{
    // SAFETY: `call_through` passes a live `FactoryCall<F>` as `ctx`.
    let call = unsafe { &mut *ctx.cast::<FactoryCall<F>>() };
    let Some(factory) = call.factory.take() else {
        return std::ptr::null_mut();
    };
    match panic::catch_unwind(AssertUnwindSafe(factory)) {
        Ok(Ok(ptr)) => ptr.as_ptr().cast(),
        Ok(Err(err)) => {
            call.error = Some(err);
            std::ptr::null_mut()
        }
        Err(payload) => {
            call.panic = Some(payload);
            std::ptr::null_mut()
        }
    }
}

/// Resolves `key` through a raw resolver, forwarding a Rust factory.
///
/// Factory errors come back as [`RegistryError::FactoryFailed`]; factory panics
/// are resumed on this side of the boundary.
///
/// # Safety
///
/// `resolve` must honor the [`module_singleton_resolve`] contract.
pub(crate) unsafe fn call_through<F>(
    resolve: RawResolveFn,
    key: &TypeKey,
    cache: Option<&AtomicPtr<()>>,
    factory: F,
) -> Result<InstancePtr, RegistryError>
where
    F: FnOnce() -> Result<InstancePtr, BoxError>,
{
    let mut call = FactoryCall {
        factory: Some(factory),
        error: None,
        panic: None,
    };
    let cache = cache.map_or(std::ptr::null(), |slot| {
        (slot as *const AtomicPtr<()>).cast::<AtomicPtr<c_void>>()
    });
    let tag = key.as_str();

    let raw = unsafe {
        resolve(
            tag.as_ptr(),
            tag.len(),
            cache,
            trampoline::<F>,
            (&mut call as *mut FactoryCall<F>).cast(),
        )
    };

    if let Some(payload) = call.panic.take() {
        panic::resume_unwind(payload);
    }
    if let Some(source) = call.error.take() {
        return Err(RegistryError::FactoryFailed {
            key: key.clone(),
            source,
        });
    }
    InstancePtr::from_raw(raw).ok_or_else(|| RegistryError::NoInstance { key: key.clone() })
}
