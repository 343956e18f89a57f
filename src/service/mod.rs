//! Business logic, independent of the transport.

mod echo;
pub mod logs;

pub use echo::EchoService;
