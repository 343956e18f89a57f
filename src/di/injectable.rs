use crate::di::Container;
use crate::error::Result;

/// Types constructed by resolving their dependencies from the [`Container`].
///
/// Every controller implements this; the registry calls it once per build.
///
/// # Example
/// ```
/// use nanoservice::config::ConfigService;
/// use nanoservice::di::{Container, Injectable};
/// use std::sync::Arc;
///
/// struct Greeter {
///     config: Arc<ConfigService>,
/// }
///
/// impl Injectable for Greeter {
///     fn inject(container: &Container) -> nanoservice::Result<Self> {
///         Ok(Self { config: container.resolve()? })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// # Errors
    /// Returns an error if any required dependency is not registered.
    fn inject(container: &Container) -> Result<Self>;
}
