use serde::{Deserialize, Serialize};

/// Estado de una invocación.
///
/// Las transiciones válidas son:
/// - `Pending` -> `Running`
/// - `Running` -> `Succeeded`
/// - `Running` -> `Failed`
///
/// No se permiten reversiones: la fase `finally` observa el resultado pero no
/// puede devolver un `Failed` a `Succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// Contrato validado, aún sin ejecutar steps.
    Pending,
    /// Ejecutando fases.
    Running,
    /// Terminó sin errores.
    Succeeded,
    /// Terminó con errores (o desenrollada por un raise).
    Failed,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}
