use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::category::IoCategory;
use crate::config::validate_id;
use crate::error::{Error, Result};
use crate::io::{IoInstance, TypedIo};

struct Entry {
    seq: u64,
    instance: IoInstance,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

/// Id to live instance map of one context.
///
/// All categories share one namespace. Every operation takes the single
/// lock once, so operations on one id are linearizable.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `instance` under its own id.
    pub fn register(&self, instance: IoInstance) -> Result<()> {
        let id = validate_id(instance.id())?.to_owned();
        let mut inner = self.inner.write();
        if inner.entries.contains_key(&id) {
            return Err(Error::AlreadyExists { id });
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        trace!(id = %id, seq, category = %instance.category(), "registered");
        inner.entries.insert(id, Entry { seq, instance });
        Ok(())
    }

    /// Look up `id` and check it is of `category`.
    pub fn get(&self, id: &str, category: IoCategory) -> Result<IoInstance> {
        let instance = self.lookup(id)?;
        if instance.category() != category {
            return Err(Error::TypeMismatch {
                id: instance.id().to_owned(),
                expected: category,
                actual: instance.category(),
            });
        }
        Ok(instance)
    }

    pub fn get_typed<T: TypedIo + ?Sized>(&self, id: &str) -> Result<Arc<T>> {
        self.lookup(id)?.expect_typed::<T>()
    }

    /// Look up `id` whatever its category.
    pub fn lookup(&self, id: &str) -> Result<IoInstance> {
        let key = validate_id(id)?;
        self.inner
            .read()
            .entries
            .get(key)
            .map(|entry| entry.instance.clone())
            .ok_or_else(|| Error::NotFound { id: key.to_owned() })
    }

    /// Unbind `id`. The caller owns closing the returned instance.
    pub fn remove(&self, id: &str) -> Result<IoInstance> {
        let key = validate_id(id)?;
        let entry = self
            .inner
            .write()
            .entries
            .remove(key)
            .ok_or_else(|| Error::NotFound { id: key.to_owned() })?;
        trace!(id = %key, "unregistered");
        Ok(entry.instance)
    }

    pub fn exists(&self, id: &str) -> bool {
        validate_id(id)
            .map(|key| self.inner.read().entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in creation order.
    pub fn ids(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut ids: Vec<(u64, &String)> =
            inner.entries.iter().map(|(id, e)| (e.seq, id)).collect();
        ids.sort_unstable_by_key(|(seq, _)| *seq);
        ids.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Unbind everything, newest first.
    pub fn drain_reverse(&self) -> Vec<IoInstance> {
        let mut entries: Vec<Entry> =
            self.inner.write().entries.drain().map(|(_, e)| e).collect();
        entries.sort_unstable_by(|a, b| b.seq.cmp(&a.seq));
        entries.into_iter().map(|e| e.instance).collect()
    }
}
