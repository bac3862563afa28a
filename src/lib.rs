//! # Module Singleton
//!
//! A process-wide singleton registry that keeps exactly one instance per type even
//! when the type's code is linked into several dynamically loaded modules.
//!
//! Every module has its own copy of static data, so a plain `static` or
//! `LazyLock` gives one instance *per module*. This crate routes instance
//! creation through a single table owned by one module and keyed by a
//! [`TypeKey`] every module agrees on.
//!
//! ## Quick Start
//!
//! ```rust
//! use module_singleton::{define_singleton, Singleton};
//!
//! struct Settings {
//!     verbose: bool,
//! }
//!
//! define_singleton!(Settings, "app::Settings", Settings { verbose: true });
//!
//! let settings = Settings::get_instance();
//! assert!(settings.verbose);
//! assert!(std::ptr::eq(settings, Settings::get_instance()));
//! ```
//!
//! ## Sharing across modules
//!
//! Build exactly one module with the `export-resolver` feature. It exports
//! [`module_singleton_resolve`] and owns the table. Every other module links to
//! it once, before touching any singleton, with [`install_resolver`] (host passes
//! the function pointer) or [`link_from_process`] / [`link_from_library`].
//!
//! ## Limitations
//!
//! - Resolving a singleton from inside its own factory deadlocks.
//! - Instances are never dropped. There is no teardown order across modules, and
//!   touching a singleton while its owning module unloads is undefined behavior.
//! - Two types sharing one key silently share one instance.
//!
//! ## Main Items
//!
//! - [`Singleton`] / [`define_singleton!`] - typed `get_instance()` access
//! - [`SingletonHandle`] - shared handle that never drops the instance
//! - [`Registry`] - the holder table and its `resolve` protocol
//! - [`set_trace_callback`] - observe registry events

mod ffi;
mod handle;
mod link;
mod macros;
mod registry;
mod registry_error;
mod registry_event;
mod singleton;
mod type_key;

pub use ffi::{module_singleton_resolve, RawFactory, RawResolveFn, RESOLVE_SYMBOL};
pub use handle::SingletonHandle;
pub use link::{install_resolver, linked_resolver, resolve_shared};
#[cfg(feature = "dynamic-link")]
pub use link::link_from_library;
#[cfg(all(feature = "dynamic-link", any(unix, windows)))]
pub use link::link_from_process;
pub use registry::{
    clear_trace_callback, contains, is_resolved, resolve, set_trace_callback, Holder,
    InstancePtr, Registry, TraceCallback,
};
pub use registry_error::{BoxError, RegistryError};
pub use registry_event::RegistryEvent;
pub use singleton::Singleton;
pub use type_key::TypeKey;
