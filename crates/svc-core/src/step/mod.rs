//! Steps y resolución del plan de ejecución.
//!
//! Un step es una unidad nombrada de lógica dentro del pipeline de un
//! servicio. Este módulo define:
//! - `StepSpec`: declaración (cuerpo, guarda, ancla, `always`).
//! - `Directive`: alta/baja de steps tal como la declara cada definición.
//! - `resolve_phase` / `ResolvedPlan`: el plan final, ordenado y sin
//!   duplicados, para la hoja de una cadena de definiciones.
//! - `InvocationState`: máquina de estados de una invocación.

pub mod definition;
pub mod plan;
mod status;

pub use definition::{Anchor, Condition, Guard, Phase, StepBody, StepResult, StepSpec};
pub use plan::{resolve_phase, Directive, ResolvedPlan};
pub use status::InvocationState;
