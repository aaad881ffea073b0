//! Module registry.
//!
//! Maps module kind IDs to factory functions so the control surface can
//! instantiate modules by name and list the available catalog.

use std::collections::HashMap;

use super::module_trait::{DspModule, ModuleInfo};

/// Factory function type for creating module instances.
pub type ModuleFactory = fn() -> Box<dyn DspModule>;

/// Catalog of available DSP module kinds.
pub struct ModuleRegistry {
    /// Map of module kind ID to factory function.
    factories: HashMap<&'static str, ModuleFactory>,
    /// Cached module information for listing.
    infos: Vec<ModuleInfo>,
}

impl ModuleRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            infos: Vec::new(),
        }
    }

    /// Registers a module kind.
    ///
    /// A throwaway instance is created to capture the kind's info.
    ///
    /// # Panics
    ///
    /// Panics if a module with the same ID is already registered.
    pub fn register<M: DspModule + Default + 'static>(&mut self) {
        let temp = M::default();
        let info = temp.info().clone();
        let id = info.id;

        if self.factories.contains_key(id) {
            panic!("Module '{}' is already registered", id);
        }

        self.factories.insert(id, create_module::<M>);
        self.infos.push(info);
    }

    /// Creates a new instance of a module kind by its ID.
    ///
    /// Returns `None` if no kind with the given ID is registered.
    pub fn create(&self, id: &str) -> Option<Box<dyn DspModule>> {
        self.factories.get(id).map(|factory| factory())
    }

    /// Returns the info of every registered kind.
    pub fn list_modules(&self) -> &[ModuleInfo] {
        &self.infos
    }

    /// Returns the number of registered kinds.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Checks if a kind with the given ID is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn create_module<M: DspModule + Default + 'static>() -> Box<dyn DspModule> {
    Box::new(M::default())
}
