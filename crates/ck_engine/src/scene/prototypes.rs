//! Prototype pools for shared models and shaders
//!
//! Every model file and every shader program is loaded at most once per
//! scene. Objects hold `Arc` clones of the pooled prototype; the pool keeps
//! one reference of its own so a prototype survives until it is pruned.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::{Component, Path};
use std::sync::Arc;

use crate::render::ShaderPaths;

/// Deduplicating cache of shared, immutable prototypes
pub struct PrototypeCache<K, T: ?Sized> {
    entries: HashMap<K, Arc<T>>,
}

impl<K: Eq + Hash + Clone, T: ?Sized> PrototypeCache<K, T> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Number of cached prototypes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is cached
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached prototype for `key`
    pub fn get(&self, key: &K) -> Option<&Arc<T>> {
        self.entries.get(key)
    }

    /// Return the cached prototype for `key`, calling `load` on a miss
    ///
    /// A failed load leaves the cache untouched.
    pub fn get_or_load<E>(
        &mut self,
        key: K,
        load: impl FnOnce(&K) -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(existing) = self.entries.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let prototype = load(&key)?;
        self.entries.insert(key, Arc::clone(&prototype));
        Ok(prototype)
    }

    /// Add a prototype loaded elsewhere
    ///
    /// If `key` is already cached the existing prototype wins and is
    /// returned instead.
    pub fn insert(&mut self, key: K, prototype: Arc<T>) -> Arc<T> {
        Arc::clone(self.entries.entry(key).or_insert(prototype))
    }

    /// Drop prototypes only the cache still references
    ///
    /// Returns how many were dropped.
    pub fn prune_unused(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, prototype| Arc::strong_count(prototype) > 1);
        before - self.entries.len()
    }

    /// Drop every prototype
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached keys, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.keys()
    }
}

impl<K: Eq + Hash + Clone, T: ?Sized> Default for PrototypeCache<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, T: ?Sized> fmt::Debug for PrototypeCache<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrototypeCache")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Lexically normalise a load path so equivalent spellings share a key
///
/// `.` segments and duplicate separators are dropped, `name/..` pairs are
/// collapsed and backslashes are treated as separators. The filesystem is
/// never touched, so missing files normalise the same way as present ones.
pub fn canonicalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut absolute = false;
    let mut parts: Vec<String> = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::RootDir => absolute = true,
            Component::Prefix(prefix) => parts.push(prefix.as_os_str().to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(last) if last != ".." => {
                    parts.pop();
                }
                // `/..` is `/`
                _ if absolute => {}
                _ => parts.push("..".to_string()),
            },
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Canonical key of a shader program
pub fn canonicalize_shader(paths: &ShaderPaths) -> ShaderPaths {
    paths.map(canonicalize_path)
}
