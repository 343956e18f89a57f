//! Application bootstrap and shutdown.
//!
//! [`Application::builder`] assembles the dependency container, registers
//! every controller under the configured URL prefix, and wraps the resulting
//! router with the interceptor chain and panic catcher. [`Application::serve`]
//! runs it until a shutdown signal arrives.

mod application;
mod shutdown;

pub use application::{Application, ApplicationBuilder};
pub use shutdown::shutdown_signal;
