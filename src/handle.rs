use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Reference-counted handle to a singleton that never owns it.
///
/// Clones share one count, like an `Arc`, so a handle fits anywhere shared
/// ownership is expected. Dropping the last handle only drops the count: the
/// singleton lives in the static storage of the module that built it.
pub struct SingletonHandle<T: 'static> {
    inner: Arc<&'static T>,
}

impl<T: 'static> SingletonHandle<T> {
    pub fn new(instance: &'static T) -> Self {
        SingletonHandle {
            inner: Arc::new(instance),
        }
    }

    /// The underlying `'static` reference.
    pub fn get(&self) -> &'static T {
        *self.inner
    }

    /// Number of handles sharing this count.
    pub fn handle_count(this: &Self) -> usize {
        Arc::strong_count(&this.inner)
    }

    /// Whether both handles point at the same instance, regardless of count.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        std::ptr::eq(this.get(), other.get())
    }
}

impl<T: 'static> Clone for SingletonHandle<T> {
    fn clone(&self) -> Self {
        SingletonHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Deref for SingletonHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: 'static> AsRef<T> for SingletonHandle<T> {
    fn as_ref(&self) -> &T {
        self.get()
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for SingletonHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SingletonHandle").field(self.get()).finish()
    }
}
