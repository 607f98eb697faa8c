//! Attribute identifiers: plain names or anonymous tokens.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::Equivalent;

/// Reference counted token naming an attribute that has no user visible name.
///
/// Two ids are equal only if they are clones of the same token.
#[derive(Clone)]
pub struct AnonymousAttributeId(Arc<AnonymousToken>);

struct AnonymousToken {
  debug_name: String,
}

impl AnonymousAttributeId {
  pub fn new(debug_name: impl Into<String>) -> Self {
    Self(Arc::new(AnonymousToken {
      debug_name: debug_name.into(),
    }))
  }

  pub fn debug_name(&self) -> &str {
    &self.0.debug_name
  }

  /// Number of live handles to this token.
  pub fn strong_count(&self) -> usize {
    Arc::strong_count(&self.0)
  }

  #[inline]
  fn address(&self) -> usize {
    Arc::as_ptr(&self.0) as usize
  }
}

impl PartialEq for AnonymousAttributeId {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for AnonymousAttributeId {}

impl Hash for AnonymousAttributeId {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.address().hash(state);
  }
}

impl fmt::Debug for AnonymousAttributeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<anonymous {} @{:x}>", self.debug_name(), self.address())
  }
}

/// Owned attribute identifier, used as storage key.
#[derive(Clone, PartialEq, Eq)]
pub enum AttributeId {
  Named(Arc<str>),
  Anonymous(AnonymousAttributeId),
}

/// Borrowed attribute identifier, used for lookups without allocating.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum AttributeIdRef<'a> {
  Named(&'a str),
  Anonymous(&'a AnonymousAttributeId),
}

impl AttributeId {
  #[inline]
  pub fn as_ref(&self) -> AttributeIdRef<'_> {
    match self {
      AttributeId::Named(name) => AttributeIdRef::Named(name),
      AttributeId::Anonymous(id) => AttributeIdRef::Anonymous(id),
    }
  }

  #[inline]
  pub fn is_anonymous(&self) -> bool {
    matches!(self, AttributeId::Anonymous(_))
  }

  pub fn name(&self) -> Option<&str> {
    match self {
      AttributeId::Named(name) => Some(&**name),
      AttributeId::Anonymous(_) => None,
    }
  }

  pub fn anonymous_id(&self) -> Option<&AnonymousAttributeId> {
    match self {
      AttributeId::Named(_) => None,
      AttributeId::Anonymous(id) => Some(id),
    }
  }
}

impl<'a> AttributeIdRef<'a> {
  #[inline]
  pub fn is_anonymous(&self) -> bool {
    matches!(self, AttributeIdRef::Anonymous(_))
  }

  pub fn name(&self) -> Option<&'a str> {
    match *self {
      AttributeIdRef::Named(name) => Some(name),
      AttributeIdRef::Anonymous(_) => None,
    }
  }

  pub fn to_owned(&self) -> AttributeId {
    match self {
      AttributeIdRef::Named(name) => AttributeId::Named(Arc::from(*name)),
      AttributeIdRef::Anonymous(id) => AttributeId::Anonymous((*id).clone()),
    }
  }
}

// Both forms hash identically so either can look up the other.
impl Hash for AttributeId {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.as_ref().hash(state)
  }
}

impl Hash for AttributeIdRef<'_> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    match self {
      AttributeIdRef::Named(name) => name.hash(state),
      AttributeIdRef::Anonymous(id) => id.hash(state),
    }
  }
}

impl Equivalent<AttributeId> for AttributeIdRef<'_> {
  fn equivalent(&self, key: &AttributeId) -> bool {
    *self == key.as_ref()
  }
}

impl From<&str> for AttributeId {
  fn from(name: &str) -> Self {
    AttributeId::Named(Arc::from(name))
  }
}

impl From<String> for AttributeId {
  fn from(name: String) -> Self {
    AttributeId::Named(Arc::from(name))
  }
}

impl From<AnonymousAttributeId> for AttributeId {
  fn from(id: AnonymousAttributeId) -> Self {
    AttributeId::Anonymous(id)
  }
}

impl From<&AnonymousAttributeId> for AttributeId {
  fn from(id: &AnonymousAttributeId) -> Self {
    AttributeId::Anonymous(id.clone())
  }
}

impl From<&AttributeId> for AttributeId {
  fn from(id: &AttributeId) -> Self {
    id.clone()
  }
}

impl From<AttributeIdRef<'_>> for AttributeId {
  fn from(id: AttributeIdRef<'_>) -> Self {
    id.to_owned()
  }
}

impl<'a> From<&'a str> for AttributeIdRef<'a> {
  fn from(name: &'a str) -> Self {
    AttributeIdRef::Named(name)
  }
}

impl<'a> From<&'a String> for AttributeIdRef<'a> {
  fn from(name: &'a String) -> Self {
    AttributeIdRef::Named(name)
  }
}

impl<'a> From<&'a AttributeId> for AttributeIdRef<'a> {
  fn from(id: &'a AttributeId) -> Self {
    id.as_ref()
  }
}

impl<'a> From<&'a AnonymousAttributeId> for AttributeIdRef<'a> {
  fn from(id: &'a AnonymousAttributeId) -> Self {
    AttributeIdRef::Anonymous(id)
  }
}

impl fmt::Display for AttributeIdRef<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AttributeIdRef::Named(name) => f.write_str(name),
      AttributeIdRef::Anonymous(id) => write!(f, "{id:?}"),
    }
  }
}

impl fmt::Display for AttributeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.as_ref(), f)
  }
}

impl fmt::Debug for AttributeIdRef<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AttributeIdRef::Named(name) => write!(f, "{name:?}"),
      AttributeIdRef::Anonymous(id) => write!(f, "{id:?}"),
    }
  }
}

impl fmt::Debug for AttributeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&self.as_ref(), f)
  }
}

#[cfg(test)]
mod tests {
  use indexmap::IndexSet;

  use super::*;

  #[test]
  fn test_named_ids_compare_by_string() {
    assert_eq!(AttributeId::from("uv"), AttributeId::from(String::from("uv")));
    assert_ne!(AttributeId::from("uv"), AttributeId::from("UV"));
  }

  #[test]
  fn test_anonymous_ids_compare_by_identity() {
    let a = AnonymousAttributeId::new("tmp");
    let b = AnonymousAttributeId::new("tmp");
    assert_eq!(AttributeId::from(&a), AttributeId::from(a.clone()));
    assert_ne!(AttributeId::from(&a), AttributeId::from(&b));
    assert_eq!(a.strong_count(), 1);

    let held = AttributeId::from(&a);
    assert_eq!(a.strong_count(), 2);
    drop(held);
    assert_eq!(a.strong_count(), 1);
  }

  #[test]
  fn test_borrowed_lookup_in_set() {
    let anonymous = AnonymousAttributeId::new("selection");
    let mut set = IndexSet::new();
    set.insert(AttributeId::from("radius"));
    set.insert(AttributeId::from(&anonymous));

    assert_eq!(set.get_index_of(&AttributeIdRef::Named("radius")), Some(0));
    assert_eq!(set.get_index_of(&AttributeIdRef::Anonymous(&anonymous)), Some(1));
    assert_eq!(set.get_index_of(&AttributeIdRef::Named("selection")), None);
  }
}
