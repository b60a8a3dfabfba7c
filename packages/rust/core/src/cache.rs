//! Memoized attribute lists of modules and macros.

use std::collections::HashMap;
use std::rc::Rc;

use iodschema_shared::Attribute;

/// Parsed attribute lists keyed by the id they were resolved from.
///
/// Entries are shared: every lookup of an id hands out the same `Rc`, and
/// callers clone out of it when they need an independent copy.
#[derive(Debug, Default)]
pub struct AttributeCache {
    entries: HashMap<String, Rc<Vec<Attribute>>>,
}

/// Macro table id → attributes.
pub type MacroCache = AttributeCache;

/// Module section id → attributes.
pub type ModuleCache = AttributeCache;

impl AttributeCache {
    pub fn get(&self, id: &str) -> Option<Rc<Vec<Attribute>>> {
        self.entries.get(id).cloned()
    }

    /// Store a freshly parsed list and return the shared handle.
    pub fn insert(&mut self, id: &str, attributes: Vec<Attribute>) -> Rc<Vec<Attribute>> {
        let shared = Rc::new(attributes);
        self.entries.insert(id.to_string(), Rc::clone(&shared));
        shared
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
