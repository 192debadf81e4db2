//! In-process service registry.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use super::{RegistryError, ServiceConfig, ServiceHandle, ServiceRegistry, ServiceSpec};

/// One call made against the registry, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Create(String),
    Open(String),
    QueryConfig(String),
    Delete(String),
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, ServiceConfig>,
    failing_queries: BTreeSet<String>,
    failing_creates: bool,
    failing_deletes: bool,
    invalid_handles: bool,
    journal: Vec<RegistryCall>,
}

/// Keeps service entries in a map and journals every call.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    state: Rc<RefCell<State>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register an entry.
    pub fn with_service(self, name: &str, config: ServiceConfig) -> Self {
        self.state.borrow_mut().entries.insert(name.into(), config);
        self
    }

    /// Make `query_config` fail for `name`.
    pub fn failing_query(self, name: &str) -> Self {
        self.state.borrow_mut().failing_queries.insert(name.into());
        self
    }

    pub fn failing_creates(self) -> Self {
        self.state.borrow_mut().failing_creates = true;
        self
    }

    pub fn failing_deletes(self) -> Self {
        self.state.borrow_mut().failing_deletes = true;
        self
    }

    /// Hand out handles whose `is_valid` is false.
    pub fn invalid_handles(self) -> Self {
        self.state.borrow_mut().invalid_handles = true;
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.borrow().entries.contains_key(name)
    }

    pub fn config(&self, name: &str) -> Option<ServiceConfig> {
        self.state.borrow().entries.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.borrow().journal.clone()
    }

    fn record(&self, call: RegistryCall) {
        self.state.borrow_mut().journal.push(call);
    }

    fn handle(&self, name: &str) -> MemoryServiceHandle {
        MemoryServiceHandle {
            name: name.into(),
            valid: !self.state.borrow().invalid_handles,
            state: Rc::clone(&self.state),
        }
    }
}

#[derive(Debug)]
pub struct MemoryServiceHandle {
    name: String,
    valid: bool,
    state: Rc<RefCell<State>>,
}

impl ServiceHandle for MemoryServiceHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn query_config(&self) -> Result<ServiceConfig, RegistryError> {
        let mut state = self.state.borrow_mut();
        state.journal.push(RegistryCall::QueryConfig(self.name.clone()));
        if state.failing_queries.contains(&self.name) {
            return Err(RegistryError::AccessDenied);
        }
        state.entries.get(&self.name).cloned().ok_or(RegistryError::NotFound)
    }
}

impl ServiceRegistry for InMemoryRegistry {
    type Handle = MemoryServiceHandle;

    fn create_service(&self, spec: &ServiceSpec) -> Result<Self::Handle, RegistryError> {
        self.record(RegistryCall::Create(spec.name.clone()));
        {
            let mut state = self.state.borrow_mut();
            if state.failing_creates {
                return Err(RegistryError::AccessDenied);
            }
            if state.entries.contains_key(&spec.name) {
                return Err(RegistryError::AlreadyExists);
            }
            state.entries.insert(spec.name.clone(), spec.to_config());
        }
        Ok(self.handle(&spec.name))
    }

    fn open_service(&self, name: &str) -> Result<Self::Handle, RegistryError> {
        self.record(RegistryCall::Open(name.into()));
        if !self.contains(name) {
            return Err(RegistryError::NotFound);
        }
        Ok(self.handle(name))
    }

    fn delete_service(&self, handle: Self::Handle) -> Result<(), RegistryError> {
        self.record(RegistryCall::Delete(handle.name.clone()));
        let mut state = self.state.borrow_mut();
        if state.failing_deletes {
            return Err(RegistryError::AccessDenied);
        }
        state
            .entries
            .remove(&handle.name)
            .map(|_| ())
            .ok_or(RegistryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DEFAULT_DISPLAY_NAME;

    #[test]
    fn create_open_delete_cycle() {
        let registry = InMemoryRegistry::new();
        let spec = ServiceSpec::kernel_driver("drv", DEFAULT_DISPLAY_NAME, r"C:\drv.sys".into());

        let created = registry.create_service(&spec).unwrap();
        assert!(created.is_valid());
        assert!(matches!(
            registry.create_service(&spec),
            Err(RegistryError::AlreadyExists)
        ));

        let opened = registry.open_service("drv").unwrap();
        assert_eq!(opened.query_config().unwrap(), spec.to_config());
        registry.delete_service(opened).unwrap();

        assert!(!registry.contains("drv"));
        assert!(matches!(registry.open_service("drv"), Err(RegistryError::NotFound)));
        assert_eq!(
            registry.calls(),
            vec![
                RegistryCall::Create("drv".into()),
                RegistryCall::Create("drv".into()),
                RegistryCall::Open("drv".into()),
                RegistryCall::QueryConfig("drv".into()),
                RegistryCall::Delete("drv".into()),
                RegistryCall::Open("drv".into()),
            ]
        );
    }
}
