//! Index Manager
//!
//! Owns the schema registry, every index's per-field structures and the
//! document store, and routes writes between them.
//!
//! # API
//!
//! - `create_index(name, prefix, fields)` - Register a schema and backfill it
//! - `drop_index(name)` - Remove a schema and its structures
//! - `put(key, body)` - Store a document and update every matching index
//! - `index(name)` - Shared handle used by the query and aggregation engines
//!
//! # Locking
//!
//! Locks are always taken in the order: registry, index data (name order),
//! document store. The registry lock is released before any index lock is
//! taken.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::observability::Event;
use crate::schema::{FieldSchema, IndexSchema};

use super::entry::IndexEntry;
use super::errors::{IndexError, IndexResult};
use super::field::{DocId, DocSet, FieldIndex};
use super::store::DocumentStore;

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Derived data of one index: key handles, entries and field structures
#[derive(Debug)]
pub struct IndexData {
    ids: HashMap<String, DocId>,
    docs: Vec<(String, IndexEntry)>,
    fields: Vec<FieldIndex>,
}

impl IndexData {
    fn new(schema: &IndexSchema) -> Self {
        Self {
            ids: HashMap::new(),
            docs: Vec::new(),
            fields: schema
                .fields()
                .iter()
                .map(|f| FieldIndex::for_type(f.field_type))
                .collect(),
        }
    }

    /// Replaces the entry of `key`, assigning a handle on first write
    fn upsert(&mut self, key: &str, entry: IndexEntry) -> DocId {
        let id = match self.ids.get(key) {
            Some(&id) => {
                let (_, old) = &self.docs[id as usize];
                for (position, value) in old.present() {
                    self.fields[position].remove(id, value);
                }
                id
            }
            None => {
                let id = self.docs.len() as DocId;
                self.ids.insert(key.to_string(), id);
                self.docs.push((key.to_string(), IndexEntry::default()));
                id
            }
        };

        for (position, value) in entry.present() {
            self.fields[position].insert(id, value);
        }
        self.docs[id as usize].1 = entry;
        id
    }

    /// Number of indexed documents
    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    /// Every indexed document
    pub fn all_docs(&self) -> DocSet {
        (0..self.docs.len() as DocId).collect()
    }

    /// Returns the document key of a handle
    pub fn key(&self, id: DocId) -> Option<&str> {
        self.docs.get(id as usize).map(|(key, _)| key.as_str())
    }

    /// Returns the handle of a document key
    pub fn id(&self, key: &str) -> Option<DocId> {
        self.ids.get(key).copied()
    }

    /// Returns the extracted entry of a handle
    pub fn entry(&self, id: DocId) -> Option<&IndexEntry> {
        self.docs.get(id as usize).map(|(_, entry)| entry)
    }

    /// Returns the structure of the field at `position`
    pub fn field(&self, position: usize) -> &FieldIndex {
        &self.fields[position]
    }
}

/// A registered index: immutable schema plus lock-guarded data
#[derive(Debug)]
pub struct Index {
    schema: IndexSchema,
    data: RwLock<IndexData>,
}

impl Index {
    fn new(schema: IndexSchema) -> Self {
        let data = RwLock::new(IndexData::new(&schema));
        Self { schema, data }
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Takes the shared lock. Readers never observe a partial update.
    pub fn read(&self) -> RwLockReadGuard<'_, IndexData> {
        read_lock(&self.data)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexData> {
        write_lock(&self.data)
    }
}

/// Summary of one index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub prefix: String,
    pub fields: Vec<FieldSchema>,
    pub num_docs: usize,
    /// Distinct indexed values per field alias
    pub distinct_values: BTreeMap<String, usize>,
}

/// Schema registry and write router
#[derive(Debug, Default)]
pub struct IndexManager {
    indexes: RwLock<BTreeMap<String, Arc<Index>>>,
    store: RwLock<DocumentStore>,
    strict_types: bool,
}

impl IndexManager {
    /// Creates an empty manager that skips mistyped fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty manager; with `strict_types` a mistyped field fails
    /// the whole write.
    pub fn with_strict_types(strict_types: bool) -> Self {
        Self {
            strict_types,
            ..Self::default()
        }
    }

    /// Registers a new index and indexes already stored documents under its
    /// prefix.
    ///
    /// Mistyped fields in existing documents are always skipped here; the
    /// stored documents were accepted when written.
    pub fn create_index(
        &self,
        name: &str,
        prefix: &str,
        fields: Vec<FieldSchema>,
    ) -> IndexResult<()> {
        let schema = IndexSchema::new(name, prefix, fields)?;

        let mut registry = write_lock(&self.indexes);
        if registry.contains_key(name) {
            return Err(IndexError::DuplicateIndex(name.to_string()));
        }

        let index = Index::new(schema);
        let backfilled = {
            let store = read_lock(&self.store);
            let mut data = index.write();
            let keys = store.keys_with_prefix(prefix);
            for key in &keys {
                if let Some(body) = store.get(key) {
                    let (entry, mismatches) = IndexEntry::extract(&index.schema, body);
                    log_skipped(name, key, &mismatches);
                    data.upsert(key, entry);
                }
            }
            keys.len()
        };

        info!(
            event = %Event::IndexCreated,
            index = name,
            prefix,
            fields = index.schema.fields().len(),
            backfilled,
            "index created"
        );
        registry.insert(name.to_string(), Arc::new(index));
        Ok(())
    }

    /// Removes an index. Stored documents are untouched.
    pub fn drop_index(&self, name: &str) -> IndexResult<()> {
        let removed = write_lock(&self.indexes).remove(name);
        match removed {
            Some(_) => {
                info!(event = %Event::IndexDropped, index = name, "index dropped");
                Ok(())
            }
            None => Err(IndexError::UnknownIndex(name.to_string())),
        }
    }

    /// Stores a document and updates every index whose prefix matches `key`.
    ///
    /// Extraction for all matching indexes happens before anything is
    /// mutated, so a rejected write leaves no trace.
    pub fn put(&self, key: &str, body: Value) -> IndexResult<()> {
        // Held until the store is written so a concurrent create_index
        // either sees this document in its backfill or is seen here.
        let registry = read_lock(&self.indexes);
        let matching: Vec<&Arc<Index>> = registry
            .values()
            .filter(|index| index.schema.matches_key(key))
            .collect();

        let mut prepared = Vec::with_capacity(matching.len());
        for index in matching {
            let (entry, mismatches) = IndexEntry::extract(&index.schema, &body);
            if let Some(first) = mismatches.first() {
                if self.strict_types {
                    return Err(IndexError::TypeMismatch {
                        key: key.to_string(),
                        alias: first.alias.clone(),
                        expected: first.expected,
                        actual: first.actual.clone(),
                    });
                }
                log_skipped(index.schema.name(), key, &mismatches);
            }
            prepared.push((index, entry));
        }

        // Registry iteration is in name order, which fixes the lock order.
        let mut guards: Vec<_> = prepared
            .into_iter()
            .map(|(index, entry)| (index, index.write(), entry))
            .collect();
        let mut store = write_lock(&self.store);

        for (index, data, entry) in guards.iter_mut() {
            let id = data.upsert(key, std::mem::take(entry));
            debug!(
                event = %Event::DocumentIndexed,
                index = index.schema.name(),
                key,
                doc_id = id,
                "document indexed"
            );
        }
        store.put(key, body);
        Ok(())
    }

    /// Returns a copy of the stored body of `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        read_lock(&self.store).get(key).cloned()
    }

    /// Returns a shared handle to a registered index
    pub fn index(&self, name: &str) -> IndexResult<Arc<Index>> {
        read_lock(&self.indexes)
            .get(name)
            .cloned()
            .ok_or_else(|| IndexError::UnknownIndex(name.to_string()))
    }

    /// Takes the shared document store lock.
    ///
    /// Callers holding index read guards take this last.
    pub fn store(&self) -> RwLockReadGuard<'_, DocumentStore> {
        read_lock(&self.store)
    }

    /// Registered index names, sorted
    pub fn list_indexes(&self) -> Vec<String> {
        read_lock(&self.indexes).keys().cloned().collect()
    }

    /// Describes a registered index
    pub fn index_info(&self, name: &str) -> IndexResult<IndexInfo> {
        let index = self.index(name)?;
        let data = index.read();
        let distinct_values = index
            .schema
            .fields()
            .iter()
            .enumerate()
            .map(|(position, field)| (field.alias.clone(), data.field(position).distinct_values()))
            .collect();
        Ok(IndexInfo {
            name: index.schema.name().to_string(),
            prefix: index.schema.prefix().to_string(),
            fields: index.schema.fields().to_vec(),
            num_docs: data.num_docs(),
            distinct_values,
        })
    }

    /// Number of stored documents across all prefixes
    pub fn document_count(&self) -> usize {
        read_lock(&self.store).len()
    }
}

fn log_skipped(index: &str, key: &str, mismatches: &[super::entry::Mismatch]) {
    for m in mismatches {
        warn!(
            event = %Event::FieldSkipped,
            index,
            key,
            field = %m.alias,
            expected = m.expected,
            actual = %m.actual,
            "field skipped"
        );
    }
}
