//! Cross-module type identity.
//!
//! A [`TypeKey`] names a logical singleton type. Keys compare by string
//! content, so two modules compiled separately agree on identity as long as
//! they spell the key the same way.

use std::borrow::{Borrow, Cow};
use std::fmt;

/// Identity of a logical singleton type, shared by every module in the process.
///
/// Prefer [`TypeKey::named`] with an explicit, author-chosen tag. [`TypeKey::of`]
/// derives the key from [`std::any::type_name`], which is only stable when every
/// module is built by the same toolchain.
///
/// Two distinct types mapped to the same key is a programmer error. The registry
/// does not detect it and will hand out the first type's instance for both.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    /// Creates a key from an explicit tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use module_singleton::TypeKey;
    ///
    /// let key = TypeKey::named("app::Logger");
    /// assert_eq!(key.as_str(), "app::Logger");
    /// ```
    pub const fn named(tag: &'static str) -> Self {
        TypeKey(Cow::Borrowed(tag))
    }

    /// Creates a key from the compiler's name for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey(Cow::Borrowed(std::any::type_name::<T>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Detaches the key from any borrowed module data.
    ///
    /// The registry stores owned keys so that a table entry survives the module
    /// that first supplied the tag.
    pub(crate) fn into_owned(self) -> TypeKey {
        match self.0 {
            Cow::Borrowed(tag) => TypeKey(Cow::Owned(tag.to_owned())),
            owned @ Cow::Owned(_) => TypeKey(owned),
        }
    }
}

impl From<String> for TypeKey {
    fn from(tag: String) -> Self {
        TypeKey(Cow::Owned(tag))
    }
}

impl From<&'static str> for TypeKey {
    fn from(tag: &'static str) -> Self {
        TypeKey::named(tag)
    }
}

impl Borrow<str> for TypeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({:?})", self.0)
    }
}
