//! Authoritative order store - the external list that owns order and enabled state
//!
//! The engine never caches enabled flags. Every count reads them from the
//! store at the moment it is computed.

use crate::error::{GroupError, Result};
use crate::types::{EntryId, OrderEntry};
use std::collections::HashMap;

/// Access to the external authoritative order list for the active context
pub trait OrderStore {
    /// Name of the active selection context, if any
    fn active_context(&self) -> Option<&str>;

    /// Current order list of the active context (empty without one)
    fn order(&self) -> &[OrderEntry];

    /// Mutable order list of the active context, `None` without one
    fn order_mut(&mut self) -> Option<&mut Vec<OrderEntry>>;

    /// Persist pending changes of the active context
    fn persist(&mut self) -> Result<()>;

    /// Enabled flag of an entry, `None` if the entry is not in the list
    fn is_enabled(&self, identifier: &EntryId) -> Option<bool> {
        self.order()
            .iter()
            .find(|e| &e.identifier == identifier)
            .map(|e| e.enabled)
    }

    /// Set an entry's enabled flag. Returns false if the entry is not in the
    /// list or there is no active context.
    fn set_enabled(&mut self, identifier: &EntryId, enabled: bool) -> bool {
        let Some(order) = self.order_mut() else {
            return false;
        };
        match order.iter_mut().find(|e| &e.identifier == identifier) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Position of an entry in the order list
    fn position_of(&self, identifier: &EntryId) -> Option<usize> {
        self.order().iter().position(|e| &e.identifier == identifier)
    }
}

/// In-memory order store holding one order list per named context
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    contexts: HashMap<String, Vec<OrderEntry>>,
    active: Option<String>,
    persist_count: usize,
    fail_persist: bool,
}

impl InMemoryOrderStore {
    /// Create a store with no contexts
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one active context holding `order`
    pub fn with_order(context: impl Into<String>, order: Vec<OrderEntry>) -> Self {
        let mut store = Self::new();
        let context = context.into();
        store.contexts.insert(context.clone(), order);
        store.active = Some(context);
        store
    }

    /// Add or replace a context's order list
    pub fn insert_context(&mut self, context: impl Into<String>, order: Vec<OrderEntry>) {
        self.contexts.insert(context.into(), order);
    }

    /// Switch the active context. Unknown names clear it.
    pub fn activate(&mut self, context: Option<&str>) {
        self.active = context
            .filter(|c| self.contexts.contains_key(*c))
            .map(str::to_string);
    }

    /// Identifiers of the active order list, in order
    pub fn identifiers(&self) -> Vec<&str> {
        self.order().iter().map(|e| e.identifier.as_str()).collect()
    }

    /// Number of successful persist calls
    pub fn persist_count(&self) -> usize {
        self.persist_count
    }

    /// Make every following persist call fail
    pub fn set_fail_persist(&mut self, fail: bool) {
        self.fail_persist = fail;
    }
}

impl OrderStore for InMemoryOrderStore {
    fn active_context(&self) -> Option<&str> {
        self.active.as_deref()
    }

    fn order(&self) -> &[OrderEntry] {
        self.active
            .as_ref()
            .and_then(|c| self.contexts.get(c))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn order_mut(&mut self) -> Option<&mut Vec<OrderEntry>> {
        let active = self.active.as_ref()?;
        self.contexts.get_mut(active)
    }

    fn persist(&mut self) -> Result<()> {
        if self.active.is_none() {
            return Err(GroupError::InvalidContext);
        }
        if self.fail_persist {
            return Err(GroupError::persist("store rejected the write"));
        }
        self.persist_count += 1;
        Ok(())
    }
}
