//! Process-wide store of parent records, partitioned by scope.
//!
//! Records live in a [`SlotMap`], so the [`ParentKey`] a reader keeps is a
//! generation-checked handle: once the owner removes its record, stale keys
//! simply stop resolving instead of aliasing freed or reused storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slotmap::{SlotMap, new_key_type};

use crate::error::BindingError;
use crate::host::ScopeToken;

new_key_type! {
    /// Handle to a registered parent record.
    pub struct ParentKey;
}

/// Identity of one dependent measure, used to gate ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependentId(u64);

/// Number of numeric fields a parent exposes.
pub const FIELD_COUNT: usize = 3;

/// Shared state block created and owned by exactly one dependent.
#[derive(Debug, Clone)]
pub struct ParentRecord {
    pub name: String,
    pub scope: ScopeToken,
    pub values: [i32; FIELD_COUNT],
    pub owner: DependentId,
}

impl ParentRecord {
    pub fn new(scope: ScopeToken, name: impl Into<String>, owner: DependentId) -> Self {
        Self {
            name: name.into(),
            scope,
            values: [0; FIELD_COUNT],
            owner,
        }
    }
}

pub type SharedRegistry = Arc<Mutex<ParentRegistry>>;

#[derive(Debug, Default)]
pub struct ParentRegistry {
    records: SlotMap<ParentKey, ParentRecord>,
    names: HashMap<ScopeToken, HashMap<String, ParentKey>>,
    next_dependent: u64,
}

impl ParentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Lock a shared registry. A panic in another holder never leaves the
    /// maps half-updated, so a poisoned lock is recovered.
    pub fn lock(shared: &SharedRegistry) -> MutexGuard<'_, ParentRegistry> {
        shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn next_dependent_id(&mut self) -> DependentId {
        self.next_dependent += 1;
        DependentId(self.next_dependent)
    }

    /// Insert a record. Fails if its name is already taken in its scope.
    pub fn register(&mut self, record: ParentRecord) -> Result<ParentKey, BindingError> {
        let folded = fold_name(&record.name);
        let scoped = self.names.entry(record.scope).or_default();
        if scoped.contains_key(&folded) {
            return Err(BindingError::DuplicateName {
                scope: record.scope,
                name: record.name,
            });
        }

        let key = self.records.insert(record);
        scoped.insert(folded, key);
        Ok(key)
    }

    /// Find a record by scope and case-insensitive name.
    pub fn lookup(&self, scope: ScopeToken, name: &str) -> Option<ParentKey> {
        self.names
            .get(&scope)
            .and_then(|scoped| scoped.get(&fold_name(name)))
            .copied()
    }

    /// Remove a record by scope and name. Absent entries are ignored.
    pub fn remove(&mut self, scope: ScopeToken, name: &str) -> Option<ParentRecord> {
        let scoped = self.names.get_mut(&scope)?;
        let key = scoped.remove(&fold_name(name))?;
        if scoped.is_empty() {
            self.names.remove(&scope);
        }
        self.records.remove(key)
    }

    /// Remove the record behind `key`, but only on behalf of its owner.
    pub fn remove_owned(&mut self, key: ParentKey, owner: DependentId) -> Option<ParentRecord> {
        let record = self.records.get(key)?;
        if record.owner != owner {
            return None;
        }
        let (scope, name) = (record.scope, record.name.clone());
        self.remove(scope, &name)
    }

    pub fn get(&self, key: ParentKey) -> Option<&ParentRecord> {
        self.records.get(key)
    }

    pub fn values(&self, key: ParentKey) -> Option<[i32; FIELD_COUNT]> {
        self.records.get(key).map(|record| record.values)
    }

    /// Overwrite a record's fields. Returns false when `owner` does not own it
    /// or the record is gone.
    pub fn set_values(
        &mut self,
        key: ParentKey,
        owner: DependentId,
        values: [i32; FIELD_COUNT],
    ) -> bool {
        match self.records.get_mut(key) {
            Some(record) if record.owner == owner => {
                record.values = values;
                true
            }
            _ => false,
        }
    }

    /// Drop every record of a scope, e.g. when a skin is unloaded wholesale.
    pub fn clear_scope(&mut self, scope: ScopeToken) -> usize {
        let Some(scoped) = self.names.remove(&scope) else {
            return 0;
        };
        scoped
            .into_values()
            .filter(|key| self.records.remove(*key).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn fold_name(name: &str) -> String {
    name.to_lowercase()
}
