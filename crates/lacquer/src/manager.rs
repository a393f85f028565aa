//! Reference-counted sheet cache.
//!
//! One sheet per key, shared by every consumer that asks for it. The manager
//! counts consumers: the first [`SheetManager::acquire`] attaches the sheet,
//! the release matching the last outstanding acquire detaches it, and the
//! entry itself stays cached for later reuse. Mismatched releases are
//! contract violations and surface as errors instead of being clamped, since
//! a count that ever went negative means some consumer's teardown ran twice.
//!
//! The manager is deliberately generic. Keys are anything `Eq + Hash`
//! (consumers pick what "same styles" means; the binding layer uses a
//! binding+theme pair), and artifacts are anything [`Attachable`], which is
//! what lets the tests instrument attach/detach counts with fakes.
//!
//! [`SharedManager`] wraps a manager for concurrent use and adds
//! [`SharedManager::lease`], which ties the matching release to a guard's
//! lifetime.

use crate::sheet::{Attachable, Sheet};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors from cache operations.
///
/// Each variant carries the offending key, rendered with its `Debug` form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// `put` was called for a key that already has an entry.
    #[error("an entry already exists for key {key}")]
    DuplicateKey {
        /// Debug rendering of the key.
        key: String,
    },

    /// `acquire` or `release` was called for a key with no entry.
    #[error("no entry exists for key {key}")]
    UnknownKey {
        /// Debug rendering of the key.
        key: String,
    },

    /// `release` was called on an entry whose reference count is zero.
    #[error("release without a matching acquire for key {key}")]
    Underflow {
        /// Debug rendering of the key.
        key: String,
    },
}

struct Entry<A> {
    artifact: Arc<A>,
    refs: usize,
}

/// A reference-counted cache of compiled artifacts.
///
/// Two keys denote the same entry exactly when they compare equal, so key
/// types must keep `Eq` and `Hash` consistent. Identity-style keys (ids,
/// pointers) give per-instance sheets; value-style keys deduplicate across
/// equal inputs. Both are valid; the choice belongs to the caller.
pub struct SheetManager<K, A = Sheet> {
    entries: HashMap<K, Entry<A>>,
}

impl<K, A> fmt::Debug for SheetManager<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetManager")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<K, A> Default for SheetManager<K, A> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, A> SheetManager<K, A>
where
    K: Eq + Hash + Clone + fmt::Debug,
    A: Attachable,
{
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the artifact for `key` without touching its reference count
    /// or attachment.
    pub fn get(&self, key: &K) -> Option<&Arc<A>> {
        self.entries.get(key).map(|entry| &entry.artifact)
    }

    /// Current reference count for `key`, if an entry exists.
    pub fn ref_count(&self, key: &K) -> Option<usize> {
        self.entries.get(key).map(|entry| entry.refs)
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an artifact under `key` with a reference count of zero.
    ///
    /// Insertion never attaches; attachment follows the first acquire.
    ///
    /// # Errors
    /// Returns [`CacheError::DuplicateKey`] if the key already has an entry.
    /// The existing entry is left untouched.
    pub fn put(&mut self, key: K, artifact: Arc<A>) -> Result<(), CacheError> {
        if self.entries.contains_key(&key) {
            return Err(CacheError::DuplicateKey {
                key: format!("{key:?}"),
            });
        }
        trace!(cache.key = ?key, "Sheet cached");
        self.entries.insert(key, Entry { artifact, refs: 0 });
        Ok(())
    }

    /// Take a reference to the artifact under `key`.
    ///
    /// The first acquire (count going 0 to 1) attaches the artifact.
    ///
    /// # Errors
    /// Returns [`CacheError::UnknownKey`] if no entry exists.
    pub fn acquire(&mut self, key: &K) -> Result<Arc<A>, CacheError> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Err(CacheError::UnknownKey {
                key: format!("{key:?}"),
            });
        };
        entry.refs += 1;
        if entry.refs == 1 {
            entry.artifact.attach();
            debug!(cache.key = ?key, "Sheet attached on first acquire");
        } else {
            trace!(cache.key = ?key, cache.refs = entry.refs, "Sheet acquired");
        }
        Ok(Arc::clone(&entry.artifact))
    }

    /// Drop a reference to the artifact under `key`.
    ///
    /// The release matching the last outstanding acquire (count going 1 to
    /// 0) detaches the artifact. The entry stays cached either way, so a
    /// later acquire reuses and re-attaches the same artifact.
    ///
    /// # Errors
    /// Returns [`CacheError::UnknownKey`] if no entry exists, or
    /// [`CacheError::Underflow`] if the reference count is already zero. On
    /// underflow the count stays zero and the artifact is not detached
    /// again.
    pub fn release(&mut self, key: &K) -> Result<(), CacheError> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Err(CacheError::UnknownKey {
                key: format!("{key:?}"),
            });
        };
        if entry.refs == 0 {
            return Err(CacheError::Underflow {
                key: format!("{key:?}"),
            });
        }
        entry.refs -= 1;
        if entry.refs == 0 {
            entry.artifact.detach();
            debug!(cache.key = ?key, "Sheet detached on last release");
        } else {
            trace!(cache.key = ?key, cache.refs = entry.refs, "Sheet released");
        }
        Ok(())
    }

    /// Discard every entry without detaching anything.
    ///
    /// Reference counts are forgotten along with the entries. Callers still
    /// holding an artifact keep it alive through their own `Arc`; its
    /// attachment state is theirs to deal with.
    pub fn reset(&mut self) {
        let discarded = self.entries.len();
        self.entries.clear();
        debug!(cache.discarded = discarded, "Sheet cache reset");
    }
}

/// A clonable, thread-safe handle to a [`SheetManager`].
///
/// Clones share the same underlying cache. Every operation takes the lock
/// for its full duration, so count transitions and their attach/detach side
/// effects are atomic with respect to other handles.
pub struct SharedManager<K, A = Sheet> {
    inner: Arc<Mutex<SheetManager<K, A>>>,
}

impl<K, A> Clone for SharedManager<K, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, A> Default for SharedManager<K, A> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SheetManager::default())),
        }
    }
}

impl<K, A> fmt::Debug for SharedManager<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedManager").finish_non_exhaustive()
    }
}

impl<K, A> SharedManager<K, A>
where
    K: Eq + Hash + Clone + fmt::Debug,
    A: Attachable,
{
    /// Create a handle to a fresh, empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SheetManager<K, A>> {
        self.inner.lock().expect("sheet manager lock poisoned")
    }

    /// See [`SheetManager::get`]. Returns a clone of the stored `Arc`.
    pub fn get(&self, key: &K) -> Option<Arc<A>> {
        self.lock().get(key).cloned()
    }

    /// See [`SheetManager::ref_count`].
    pub fn ref_count(&self, key: &K) -> Option<usize> {
        self.lock().ref_count(key)
    }

    /// See [`SheetManager::contains`].
    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    /// See [`SheetManager::len`].
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// See [`SheetManager::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// See [`SheetManager::put`].
    ///
    /// # Errors
    /// Returns [`CacheError::DuplicateKey`] if the key already has an entry.
    pub fn put(&self, key: K, artifact: Arc<A>) -> Result<(), CacheError> {
        self.lock().put(key, artifact)
    }

    /// See [`SheetManager::acquire`].
    ///
    /// # Errors
    /// Returns [`CacheError::UnknownKey`] if no entry exists.
    pub fn acquire(&self, key: &K) -> Result<Arc<A>, CacheError> {
        self.lock().acquire(key)
    }

    /// See [`SheetManager::release`].
    ///
    /// # Errors
    /// Returns [`CacheError::UnknownKey`] or [`CacheError::Underflow`].
    pub fn release(&self, key: &K) -> Result<(), CacheError> {
        self.lock().release(key)
    }

    /// See [`SheetManager::reset`].
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Acquire `key` and tie the matching release to the returned guard.
    ///
    /// # Errors
    /// Returns [`CacheError::UnknownKey`] if no entry exists.
    pub fn lease(&self, key: &K) -> Result<SheetLease<K, A>, CacheError> {
        let artifact = self.acquire(key)?;
        Ok(SheetLease {
            manager: self.clone(),
            key: key.clone(),
            artifact,
        })
    }
}

/// An acquired cache entry that releases itself when dropped.
///
/// Holding the lease keeps the underlying artifact attached (together with
/// any other outstanding acquires for the same key). A lease that outlives
/// its entry, e.g. across a [`SharedManager::reset`], logs a warning on drop
/// instead of panicking.
pub struct SheetLease<K, A = Sheet>
where
    K: Eq + Hash + Clone + fmt::Debug,
    A: Attachable,
{
    manager: SharedManager<K, A>,
    key: K,
    artifact: Arc<A>,
}

impl<K, A> SheetLease<K, A>
where
    K: Eq + Hash + Clone + fmt::Debug,
    A: Attachable,
{
    /// The leased artifact.
    pub const fn artifact(&self) -> &Arc<A> {
        &self.artifact
    }

    /// The key this lease holds a reference against.
    pub const fn key(&self) -> &K {
        &self.key
    }
}

impl<K, A> fmt::Debug for SheetLease<K, A>
where
    K: Eq + Hash + Clone + fmt::Debug,
    A: Attachable,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetLease")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<K, A> Drop for SheetLease<K, A>
where
    K: Eq + Hash + Clone + fmt::Debug,
    A: Attachable,
{
    fn drop(&mut self) {
        if let Err(err) = self.manager.release(&self.key) {
            warn!(cache.key = ?self.key, error = %err, "Lease release failed");
        }
    }
}
