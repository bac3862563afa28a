//! Macros for declaring singletons.
//!
//! This module provides a macro-based approach to implement
//! [`Singleton`](crate::Singleton) without writing the module-local statics by
//! hand.

/// Implements [`Singleton`](crate::Singleton) for a type with a single macro invocation.
///
/// The macro generates:
/// - The cross-module key
/// - A module-local cache static (hidden)
/// - A module-local storage static (hidden)
/// - `construct`, from an infallible expression or from a `try` expression
///   returning `Result<T, E>` with `E: Into<BoxError>`
///
/// # Examples
///
/// ```rust
/// use module_singleton::{define_singleton, Singleton};
///
/// struct Logger {
///     prefix: String,
/// }
///
/// define_singleton!(Logger, "docs::Logger", Logger { prefix: "[app]".to_string() });
///
/// let a = Logger::get_instance();
/// let b = Logger::get_instance();
/// assert!(std::ptr::eq(a, b));
/// assert_eq!(a.prefix, "[app]");
/// ```
///
/// # Fallible construction
///
/// ```rust
/// use module_singleton::{define_singleton, Singleton};
///
/// struct Port(u16);
///
/// define_singleton!(Port, "docs::Port", try "8080".parse::<u16>().map(Port));
///
/// assert_eq!(Port::try_get_instance().unwrap().0, 8080);
/// ```
///
/// The key is the identity every module agrees on, so it must be spelled the
/// same wherever the type is declared a singleton.
#[macro_export]
macro_rules! define_singleton {
    ($ty:ty, $key:expr, try $init:expr) => {
        impl $crate::Singleton for $ty {
            const KEY: $crate::TypeKey = $crate::TypeKey::named($key);

            fn cache() -> &'static ::std::sync::atomic::AtomicPtr<()> {
                // Module-local; each module linking this code gets its own slot.
                static CACHE: ::std::sync::atomic::AtomicPtr<()> =
                    ::std::sync::atomic::AtomicPtr::new(::std::ptr::null_mut());
                &CACHE
            }

            fn storage() -> &'static ::std::sync::OnceLock<Self> {
                static STORAGE: ::std::sync::OnceLock<$ty> = ::std::sync::OnceLock::new();
                &STORAGE
            }

            fn construct() -> ::std::result::Result<Self, $crate::BoxError> {
                ($init).map_err(::std::convert::Into::into)
            }
        }
    };
    ($ty:ty, $key:expr, $init:expr) => {
        $crate::define_singleton!($ty, $key, try ::std::result::Result::<$ty, $crate::BoxError>::Ok($init));
    };
}
