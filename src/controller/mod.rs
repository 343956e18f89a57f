//! Controllers and their registration.
//!
//! A controller owns one feature area and attaches its routes to the
//! [`HttpApp`] under a shared URL prefix. The [`ControllerRegistry`] is the
//! single list of controllers an application is composed from: each entry is
//! constructed from the dependency container and registered exactly once per
//! build.
//!
//! ```
//! use nanoservice::controllers;
//! use nanoservice::controller::{ActuatorController, EchoController};
//!
//! let registry = controllers![ActuatorController, EchoController];
//! assert_eq!(registry.len(), 2);
//! ```

mod actuator;
mod app;
mod echo;
pub mod mcp;
mod welcome;

pub use actuator::ActuatorController;
pub use app::{HttpApp, RouteInfo, RouteTable};
pub use echo::EchoController;
pub use mcp::{McpController, ToolDispatcher};
pub use welcome::WelcomeController;

use crate::di::{Container, Injectable};
use crate::error::{NanoserviceError, Result};
use std::any::TypeId;
use std::sync::Arc;

pub trait Controller: Send + Sync + 'static {
    /// Attach this controller's routes under `prefix`.
    ///
    /// Must only register handlers; any I/O happens inside the handlers.
    fn register_routes(self: Arc<Self>, app: &mut HttpApp, prefix: &str) -> Result<()>;
}

/// Strip trailing slashes, then make a non-empty prefix start with `/`.
///
/// ```
/// use nanoservice::controller::normalize_prefix;
///
/// assert_eq!(normalize_prefix(""), "");
/// assert_eq!(normalize_prefix("api/"), "/api");
/// assert_eq!(normalize_prefix("/api//"), "/api");
/// ```
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

type Factory = fn(&Container) -> Result<Arc<dyn Controller>>;

fn construct<C: Controller + Injectable>(container: &Container) -> Result<Arc<dyn Controller>> {
    Ok(Arc::new(C::inject(container)?))
}

#[derive(Clone, Copy)]
struct ControllerEntry {
    name: &'static str,
    type_id: TypeId,
    factory: Factory,
}

/// Compile-time list of the controllers an application is built from.
#[derive(Clone)]
pub struct ControllerRegistry {
    entries: Vec<ControllerEntry>,
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ControllerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Every controller shipped with the crate.
    pub fn builtin() -> Self {
        crate::controllers![
            ActuatorController,
            EchoController,
            McpController,
            WelcomeController,
        ]
    }

    pub fn with<C: Controller + Injectable>(mut self) -> Self {
        self.add::<C>();
        self
    }

    /// Add `C`; adding a type that is already listed does nothing.
    pub fn add<C: Controller + Injectable>(&mut self) -> &mut Self {
        let type_id = TypeId::of::<C>();
        if self.entries.iter().all(|e| e.type_id != type_id) {
            self.entries.push(ControllerEntry {
                name: short_name(std::any::type_name::<C>()),
                type_id,
                factory: construct::<C>,
            });
        }
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Construct every controller and register its routes under `prefix`.
    ///
    /// The first failure aborts the whole registration.
    pub fn register_all(&self, container: &Container, app: &mut HttpApp, prefix: &str) -> Result<()> {
        let prefix = normalize_prefix(prefix);

        for entry in &self.entries {
            let controller = (entry.factory)(container)
                .map_err(|e| NanoserviceError::registration(entry.name, e))?;
            controller
                .register_routes(app, &prefix)
                .map_err(|e| NanoserviceError::registration(entry.name, e))?;
            tracing::debug!(controller = entry.name, prefix = %prefix, "controller registered");
        }

        tracing::info!(controllers = self.entries.len(), "all controllers registered");
        Ok(())
    }
}

fn short_name(type_name: &'static str) -> &'static str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

/// Build a [`ControllerRegistry`] from a list of controller types.
#[macro_export]
macro_rules! controllers {
    ($($controller:ty),* $(,)?) => {{
        let registry = $crate::controller::ControllerRegistry::new();
        $(let registry = registry.with::<$controller>();)*
        registry
    }};
}
