use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::trace;

use crate::error::InspectError;

/// Memoized per-item inputs, shared by the inspectors of one item visit.
///
/// The scheduler calls [`reset`](Self::reset) before the first inspector
/// runs against an item, so nothing computed for one item is ever seen
/// by another.
#[derive(Default)]
pub struct PerItemCache {
    item: Option<String>,
    bytes: Option<Vec<u8>>,
    text: Option<String>,
    source_tree: Option<tree_sitter::Tree>,
    extensions: HashMap<String, Box<dyn Any + Send>>,
    parses: u64,
    hits: u64,
}

impl PerItemCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every slot and bind the cache to `item`.
    pub fn reset(&mut self, item: &str) {
        self.item = Some(item.to_string());
        self.bytes = None;
        self.text = None;
        self.source_tree = None;
        self.extensions.clear();
    }

    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }

    /// How many times a supplier ran since the cache was created.
    pub fn parse_count(&self) -> u64 {
        self.parses
    }

    pub fn hit_count(&self) -> u64 {
        self.hits
    }

    fn hit(&mut self, slot: &str) {
        self.hits += 1;
        trace!(item = self.item.as_deref().unwrap_or(""), slot, "cache hit");
    }

    /// Raw bytes of the item.
    pub fn bytes_or_load(
        &mut self,
        load: impl FnOnce() -> crate::error::Result<Vec<u8>>,
    ) -> crate::error::Result<&[u8]> {
        if self.bytes.is_some() {
            self.hit("bytes");
        } else {
            self.parses += 1;
            self.bytes = Some(load()?);
        }
        Ok(self.bytes.as_deref().unwrap_or_default())
    }

    /// Decoded text of the item.
    pub fn text_or_load(
        &mut self,
        load: impl FnOnce() -> crate::error::Result<String>,
    ) -> crate::error::Result<&str> {
        if self.text.is_some() {
            self.hit("text");
        } else {
            self.parses += 1;
            self.text = Some(load()?);
        }
        Ok(self.text.as_deref().unwrap_or_default())
    }

    /// Parsed tree-sitter tree of the item.
    pub fn source_tree_or_parse(
        &mut self,
        parse: impl FnOnce() -> crate::error::Result<tree_sitter::Tree>,
    ) -> crate::error::Result<&tree_sitter::Tree> {
        let tree = match self.source_tree.take() {
            Some(tree) => {
                self.hit("source_tree");
                tree
            }
            None => {
                self.parses += 1;
                parse()?
            }
        };
        Ok(self.source_tree.insert(tree))
    }

    /// Memoize an arbitrary value under `key`.
    pub fn get_or_compute<T: Any + Send>(
        &mut self,
        key: &str,
        compute: impl FnOnce() -> crate::error::Result<T>,
    ) -> crate::error::Result<&T> {
        let fresh = !self.extensions.get(key).is_some_and(|v| v.is::<T>());
        if fresh {
            self.parses += 1;
        } else {
            self.hit(key);
        }
        let slot = match self.extensions.entry(key.to_string()) {
            Entry::Occupied(mut e) => {
                if fresh {
                    e.insert(Box::new(compute()?));
                }
                e.into_mut()
            }
            Entry::Vacant(e) => e.insert(Box::new(compute()?)),
        };
        slot.downcast_ref::<T>().ok_or_else(|| {
            InspectError::Invalid {
                item: self.item.clone().unwrap_or_default(),
                message: format!("cache slot {key} holds another type"),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for PerItemCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerItemCache")
            .field("item", &self.item)
            .field("bytes", &self.bytes.as_ref().map(Vec::len))
            .field("text", &self.text.as_ref().map(String::len))
            .field("source_tree", &self.source_tree.is_some())
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .field("parses", &self.parses)
            .finish()
    }
}
