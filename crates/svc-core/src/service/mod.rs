//! Definiciones de servicios, herencia y registro.
mod definition;
mod registry;

pub use definition::{ServiceBuilder, ServiceDefinition};
pub use registry::ServiceRegistry;
