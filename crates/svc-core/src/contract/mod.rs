//! Contrato de argumentos y outputs de un servicio.
//!
//! - `FieldSpec`: declaración (tipo, opcional, default, contexto).
//! - `ContractCollection`: valores de una invocación validados contra las
//!   declaraciones.
//! - `Key<T>`: accesor tipado sobre la colección neutral.

mod collection;
mod key;
mod spec;

pub use collection::{ContractCollection, FieldSpecs};
pub(crate) use collection::shape_of;
pub use key::Key;
pub use spec::{ArgumentSpec, ContractKind, DefaultFn, DefaultScope, DefaultValue, FieldSpec, OutputSpec, TypeConstraint};
