//! The persisted records tree.
//!
//! Records are arbitrary JSON carried across builds to keep identifiers
//! stable. A parent compiler owns the root; every child compiler gets a
//! handle on a disjoint slot of the same tree, addressed by
//! `[relative name][index]`.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::util::sync::lock;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotKey {
  Key(String),
  Index(usize),
}

/// Shared handle on one slot of a records tree.
#[derive(Clone)]
pub struct RecordsHandle {
  root: Arc<Mutex<Value>>,
  slot: Vec<SlotKey>,
}

impl Default for RecordsHandle {
  fn default() -> Self {
    Self::new()
  }
}

impl RecordsHandle {
  /// A fresh tree holding an empty object.
  pub fn new() -> Self {
    Self {
      root: Arc::new(Mutex::new(Value::Object(Map::new()))),
      slot: Vec::new(),
    }
  }

  /// Copy of the records at this slot. An unset slot reads as `{}`.
  pub fn get(&self) -> Value {
    let root = lock(&self.root);
    slot_ref(&root, &self.slot)
      .filter(|v| !v.is_null())
      .cloned()
      .unwrap_or_else(|| Value::Object(Map::new()))
  }

  pub fn replace(&self, value: Value) {
    let mut root = lock(&self.root);
    *slot_mut(&mut root, &self.slot) = value;
  }

  /// Mutate the records at this slot in place.
  pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
    let mut root = lock(&self.root);
    f(slot_mut(&mut root, &self.slot))
  }

  /// Handle on the records of the `index`-th child compiler called `name`.
  ///
  /// Reuses the entry at `[name][index]` when one exists; otherwise appends
  /// a new empty object to `[name]` and points at it.
  pub fn child_slot(&self, name: &str, index: usize) -> RecordsHandle {
    let mut root = lock(&self.root);
    let parent = slot_mut(&mut root, &self.slot);
    let list = &mut ensure_object(parent)[name];
    if !list.is_array() {
      *list = Value::Array(Vec::new());
    }

    let mut position = index;
    if let Value::Array(entries) = list {
      let reusable = entries.get(index).is_some_and(|e| !e.is_null());
      if !reusable {
        entries.push(Value::Object(Map::new()));
        position = entries.len() - 1;
      }
    }

    let mut slot = self.slot.clone();
    slot.push(SlotKey::Key(name.to_string()));
    slot.push(SlotKey::Index(position));
    RecordsHandle {
      root: Arc::clone(&self.root),
      slot,
    }
  }

  pub fn is_root(&self) -> bool {
    self.slot.is_empty()
  }

  pub fn shares_root_with(&self, other: &RecordsHandle) -> bool {
    Arc::ptr_eq(&self.root, &other.root)
  }
}

impl fmt::Debug for RecordsHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RecordsHandle").field("slot", &self.slot).finish()
  }
}

fn ensure_object(value: &mut Value) -> &mut Value {
  if !value.is_object() {
    *value = Value::Object(Map::new());
  }
  value
}

fn slot_ref<'v>(root: &'v Value, slot: &[SlotKey]) -> Option<&'v Value> {
  slot.iter().try_fold(root, |current, key| match key {
    SlotKey::Key(name) => current.get(name.as_str()),
    SlotKey::Index(i) => current.get(*i),
  })
}

fn slot_mut<'v>(root: &'v mut Value, slot: &[SlotKey]) -> &'v mut Value {
  let mut current = root;
  for key in slot {
    current = match key {
      SlotKey::Key(name) => &mut ensure_object(current)[name.as_str()],
      SlotKey::Index(i) => {
        if !current.is_array() {
          *current = Value::Array(Vec::new());
        }
        if let Value::Array(entries) = current {
          if entries.len() <= *i {
            entries.resize(*i + 1, Value::Null);
          }
        }
        &mut current[*i]
      }
    };
  }
  current
}
