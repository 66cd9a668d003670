//! Constantes del motor core.
//!
//! `ENGINE_VERSION` forma parte del input del `plan_hash`: un cambio de
//! versión del motor cambia determinísticamente el hash de todos los planes
//! aunque las declaraciones no cambien.

/// Versión lógica del motor.
pub const ENGINE_VERSION: &str = "S1.0";

/// Campo convencional para mensajes que no pertenecen a ningún campo.
pub const BASE_FIELD: &str = "base";

/// Prefijo de las variables de entorno leídas por `Config::from_env`.
pub const ENV_PREFIX: &str = "SVCFLOW_";
