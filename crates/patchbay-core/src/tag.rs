//! Interned symbol handles.
//!
//! A [`Tag`] is the canonical handle for a string. Interning goes through a
//! single process-wide table guarded by one mutex; entries are never evicted,
//! so equal strings always resolve to the same allocation and tag equality is
//! a pointer comparison.
//!
//! Object names, attribute names and dictionary keys are all tags, which keeps
//! the hot lookups in [`AttributeManager`](crate::AttributeManager) and
//! [`Dico`](crate::Dico) cheap.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

fn table() -> &'static Mutex<HashSet<Arc<str>>> {
    static TABLE: OnceLock<Mutex<HashSet<Arc<str>>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Interned, immutable string handle.
///
/// Two tags compare equal iff they were interned from equal strings. Ordering
/// follows the underlying string so ordered maps keyed by tags iterate
/// alphabetically.
#[derive(Clone)]
pub struct Tag(Arc<str>);

impl Tag {
    /// Returns the canonical tag for `name`, creating it on first use.
    pub fn new(name: &str) -> Self {
        let mut table = table().lock();
        if let Some(existing) = table.get(name) {
            return Self(Arc::clone(existing));
        }
        let entry: Arc<str> = Arc::from(name);
        table.insert(Arc::clone(&entry));
        Self(entry)
    }

    /// Returns the tag's text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if both handles point at the same interned entry.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of distinct tags interned so far.
    pub fn interned_count() -> usize {
        table().lock().len()
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const u8 as usize).hash(state);
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.ptr_eq(other) {
            Ordering::Equal
        } else {
            self.as_str().cmp(other.as_str())
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", self.as_str())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<&String> for Tag {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<&Tag> for Tag {
    fn from(tag: &Tag) -> Self {
        tag.clone()
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
