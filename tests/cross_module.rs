//! Integration tests for sharing one instance between module copies.
//!
//! A real deployment has one `export-resolver` module and several plugins, each
//! with its own statics. Here every "module" is modelled as its own pair of
//! cache and storage statics, and the link to the owner is the crate's exported
//! resolver installed through `install_resolver`.

use module_singleton::{
    install_resolver, linked_resolver, module_singleton_resolve, resolve_shared, InstancePtr,
    Registry, RegistryError, TypeKey,
};
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Barrier, OnceLock};
use std::thread;

#[derive(Debug, PartialEq)]
struct Telemetry {
    built_by: &'static str,
}

/// The statics one module would carry for `Telemetry`.
struct ModuleCopy {
    name: &'static str,
    cache: AtomicPtr<()>,
    storage: OnceLock<Telemetry>,
}

impl ModuleCopy {
    const fn new(name: &'static str) -> Self {
        ModuleCopy {
            name,
            cache: AtomicPtr::new(std::ptr::null_mut()),
            storage: OnceLock::new(),
        }
    }

    fn get_instance(&'static self, key: &TypeKey) -> Result<&'static Telemetry, RegistryError> {
        if let Some(cached) = InstancePtr::from_raw(self.cache.load(Ordering::Acquire).cast()) {
            return Ok(unsafe { cached.as_ref::<Telemetry>() });
        }
        let ptr = resolve_shared(key, &self.cache, || {
            let stored = self.storage.get_or_init(|| Telemetry {
                built_by: self.name,
            });
            Ok(InstancePtr::from_ref(stored))
        })?;
        Ok(unsafe { ptr.as_ref::<Telemetry>() })
    }
}

fn link() {
    // Every test links the same owner; only the first install takes effect.
    unsafe { install_resolver(module_singleton_resolve) };
    assert!(linked_resolver().is_some());
}

#[test]
fn test_two_modules_resolve_same_address() {
    static HOST: ModuleCopy = ModuleCopy::new("host");
    static PLUGIN: ModuleCopy = ModuleCopy::new("plugin");
    link();

    let key = TypeKey::named("cross_module::Telemetry");
    let from_host = HOST.get_instance(&key).unwrap();
    let from_plugin = PLUGIN.get_instance(&key).unwrap();

    assert!(std::ptr::eq(from_host, from_plugin));
    assert_eq!(from_plugin.built_by, "host");
    // Only the winning module's storage is ever filled.
    assert!(HOST.storage.get().is_some());
    assert!(PLUGIN.storage.get().is_none());
    // Each module caches the shared address in its own slot.
    assert_eq!(
        HOST.cache.load(Ordering::Acquire),
        PLUGIN.cache.load(Ordering::Acquire)
    );
    assert!(Registry::global().is_resolved(&key));
}

#[test]
fn test_concurrent_modules_construct_once() {
    static MODULES: [ModuleCopy; 4] = [
        ModuleCopy::new("a"),
        ModuleCopy::new("b"),
        ModuleCopy::new("c"),
        ModuleCopy::new("d"),
    ];
    static START: OnceLock<Barrier> = OnceLock::new();
    link();

    let start = START.get_or_init(|| Barrier::new(MODULES.len()));
    let handles: Vec<_> = MODULES
        .iter()
        .map(|module| {
            thread::spawn(move || {
                start.wait();
                let key = TypeKey::named("cross_module::Concurrent");
                module.get_instance(&key).unwrap() as *const Telemetry as usize
            })
        })
        .collect();

    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    let filled = MODULES.iter().filter(|m| m.storage.get().is_some()).count();
    assert_eq!(filled, 1);
}

#[test]
fn test_factory_error_crosses_link() {
    link();
    let key = TypeKey::named("cross_module::Broken");
    let cache = AtomicPtr::new(std::ptr::null_mut());

    let err = resolve_shared(&key, &cache, || Err("disk full".into())).unwrap_err();
    assert_eq!(
        err.to_string(),
        "factory for `cross_module::Broken` failed: disk full"
    );
    assert!(!Registry::global().is_resolved(&key));
    assert!(cache.load(Ordering::Acquire).is_null());
}

#[test]
fn test_empty_key_resolves_linked_and_unlinked() {
    static EMPTY: u8 = 0;
    link();

    let unlinked = Registry::new().resolve(&TypeKey::named(""), None, || {
        Ok(InstancePtr::from_ref(&EMPTY))
    });
    let cache = AtomicPtr::new(std::ptr::null_mut());
    let linked = resolve_shared(&TypeKey::named(""), &cache, || {
        Ok(InstancePtr::from_ref(&EMPTY))
    });

    assert_eq!(unlinked.unwrap(), InstancePtr::from_ref(&EMPTY));
    assert_eq!(linked.unwrap(), InstancePtr::from_ref(&EMPTY));
    assert_eq!(cache.load(Ordering::Acquire), InstancePtr::from_ref(&EMPTY).as_ptr());
}
