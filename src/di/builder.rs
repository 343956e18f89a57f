use crate::di::Container;
use std::sync::Arc;

/// Builder for the dependency container.
///
/// # Example
/// ```
/// use nanoservice::config::ConfigService;
/// use nanoservice::di::ContainerBuilder;
/// use nanoservice::service::EchoService;
///
/// let container = ContainerBuilder::new()
///     .register(ConfigService::new())
///     .register(EchoService::new())
///     .build();
/// assert!(container.contains::<EchoService>());
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: 'static + Send + Sync>(mut self, instance: T) -> Self {
        self.container.register(instance);
        self
    }

    pub fn register_arc<T: 'static + Send + Sync>(mut self, instance: Arc<T>) -> Self {
        self.container.register_arc(instance);
        self
    }

    /// Register only if nothing of this type is present yet.
    pub fn register_default<T: 'static + Send + Sync>(mut self, make: impl FnOnce() -> T) -> Self {
        if !self.container.contains::<T>() {
            self.container.register(make());
        }
        self
    }

    pub fn build(self) -> Container {
        self.container
    }
}
