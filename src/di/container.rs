use crate::error::{NanoserviceError, Result};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Thread-safe, type-indexed container of shared collaborators.
///
/// Controllers resolve their dependencies from here when the registry
/// constructs them.
#[derive(Clone, Default)]
pub struct Container {
    services: DashMap<TypeId, ServiceEntry>,
}

#[derive(Clone)]
struct ServiceEntry {
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: 'static + Send + Sync>(&mut self, instance: T) -> &mut Self {
        self.register_arc(Arc::new(instance))
    }

    /// Register an instance that is already shared elsewhere.
    pub fn register_arc<T: 'static + Send + Sync>(&mut self, instance: Arc<T>) -> &mut Self {
        let entry = ServiceEntry {
            type_name: std::any::type_name::<T>(),
            instance,
        };
        if self.services.insert(TypeId::of::<T>(), entry).is_some() {
            tracing::debug!(type_name = std::any::type_name::<T>(), "replaced registered instance");
        }
        self
    }

    pub fn resolve<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        let entry = self
            .services
            .get(&TypeId::of::<T>())
            .ok_or_else(|| NanoserviceError::DependencyNotFound {
                type_name: std::any::type_name::<T>().to_string(),
            })?;
        entry
            .instance
            .clone()
            .downcast::<T>()
            .map_err(|_| NanoserviceError::DowncastFailed {
                type_name: entry.type_name.to_string(),
            })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestService {
        value: i32,
    }

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        container.register(TestService { value: 42 });
        let service = container.resolve::<TestService>().unwrap();
        assert_eq!(service.value, 42);
        assert!(container.contains::<TestService>());
    }

    #[test]
    fn test_register_arc_shares_instance() {
        let shared = Arc::new(TestService { value: 7 });
        let mut container = Container::new();
        container.register_arc(shared.clone());
        let resolved = container.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&shared, &resolved));
    }

    #[test]
    fn test_later_registration_wins() {
        let mut container = Container::new();
        container
            .register(TestService { value: 1 })
            .register(TestService { value: 2 });
        assert_eq!(container.resolve::<TestService>().unwrap().value, 2);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_missing_dependency() {
        let container = Container::new();
        assert!(container.is_empty());
        match container.resolve::<TestService>() {
            Err(NanoserviceError::DependencyNotFound { type_name }) => {
                assert!(type_name.ends_with("TestService"));
            }
            _ => panic!("expected DependencyNotFound"),
        }
    }
}
