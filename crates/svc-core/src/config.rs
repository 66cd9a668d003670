//! Configuración de políticas del motor.
//!
//! Tres capas, de menor a mayor precedencia:
//! 1. `Config` global (defaults, opcionalmente leída de variables de entorno
//!    `SVCFLOW_*` tras cargar `.env` una sola vez).
//! 2. `ConfigOverrides` declarados en la cadena de definiciones (raíz→hoja).
//! 3. `ConfigOverrides` de la invocación (`Runner::config`, `ChildCall`).

use std::env;

use dotenvy::dotenv;
use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::constants::ENV_PREFIX;
use crate::message::MessagePolicy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

static GLOBAL: Lazy<Config> = Lazy::new(Config::from_env);

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

/// Configuración global del proceso, construida en el primer acceso.
pub fn global() -> &'static Config {
    &GLOBAL
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Ejecuta la fase `Running` dentro de un scope transaccional cuando la
    /// definición declara un backend.
    pub use_transactions: bool,
    /// Copia los errores de un hijo invocado "con" el padre.
    pub load_errors: bool,
    /// Copia los warnings de un hijo invocado "con" el padre.
    pub load_warnings: bool,
    pub break_on_error: bool,
    pub raise_on_error: bool,
    pub rollback_on_error: bool,
    pub break_on_warning: bool,
    pub raise_on_warning: bool,
    pub rollback_on_warning: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { use_transactions: true,
               load_errors: true,
               load_warnings: true,
               break_on_error: true,
               raise_on_error: false,
               rollback_on_error: true,
               break_on_warning: false,
               raise_on_warning: false,
               rollback_on_warning: false }
    }
}

impl Config {
    /// Lee `SVCFLOW_<KNOB>` (p.ej. `SVCFLOW_BREAK_ON_ERROR=false`). Valores no
    /// reconocidos se ignoran con un warning y se mantiene el default.
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let d = Self::default();
        Self { use_transactions: env_flag("USE_TRANSACTIONS", d.use_transactions),
               load_errors: env_flag("LOAD_ERRORS", d.load_errors),
               load_warnings: env_flag("LOAD_WARNINGS", d.load_warnings),
               break_on_error: env_flag("BREAK_ON_ERROR", d.break_on_error),
               raise_on_error: env_flag("RAISE_ON_ERROR", d.raise_on_error),
               rollback_on_error: env_flag("ROLLBACK_ON_ERROR", d.rollback_on_error),
               break_on_warning: env_flag("BREAK_ON_WARNING", d.break_on_warning),
               raise_on_warning: env_flag("RAISE_ON_WARNING", d.raise_on_warning),
               rollback_on_warning: env_flag("ROLLBACK_ON_WARNING", d.rollback_on_warning) }
    }

    /// Aplica overrides: cada `Some` reemplaza el valor actual.
    pub fn apply(&self, o: &ConfigOverrides) -> Config {
        Config { use_transactions: o.use_transactions.unwrap_or(self.use_transactions),
                 load_errors: o.load_errors.unwrap_or(self.load_errors),
                 load_warnings: o.load_warnings.unwrap_or(self.load_warnings),
                 break_on_error: o.break_on_error.unwrap_or(self.break_on_error),
                 raise_on_error: o.raise_on_error.unwrap_or(self.raise_on_error),
                 rollback_on_error: o.rollback_on_error.unwrap_or(self.rollback_on_error),
                 break_on_warning: o.break_on_warning.unwrap_or(self.break_on_warning),
                 raise_on_warning: o.raise_on_warning.unwrap_or(self.raise_on_warning),
                 rollback_on_warning: o.rollback_on_warning.unwrap_or(self.rollback_on_warning) }
    }

    pub fn error_policy(&self) -> MessagePolicy {
        MessagePolicy { break_on_add: self.break_on_error,
                        raise_on_add: self.raise_on_error,
                        rollback_on_add: self.rollback_on_error }
    }

    pub fn warning_policy(&self) -> MessagePolicy {
        MessagePolicy { break_on_add: self.break_on_warning,
                        raise_on_add: self.raise_on_warning,
                        rollback_on_add: self.rollback_on_warning }
    }
}

fn env_flag(knob: &str, default: bool) -> bool {
    let key = format!("{ENV_PREFIX}{knob}");
    match env::var(&key) {
        Ok(raw) => parse_flag(&raw).unwrap_or_else(|| {
                                       warn!("config: ignoring {key}={raw:?} (expected true/false)");
                                       default
                                   }),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Overrides parciales de `Config`. `None` hereda de la capa anterior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub use_transactions: Option<bool>,
    pub load_errors: Option<bool>,
    pub load_warnings: Option<bool>,
    pub break_on_error: Option<bool>,
    pub raise_on_error: Option<bool>,
    pub rollback_on_error: Option<bool>,
    pub break_on_warning: Option<bool>,
    pub raise_on_warning: Option<bool>,
    pub rollback_on_warning: Option<bool>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_transactions(mut self, v: bool) -> Self {
        self.use_transactions = Some(v);
        self
    }

    pub fn load_errors(mut self, v: bool) -> Self {
        self.load_errors = Some(v);
        self
    }

    pub fn load_warnings(mut self, v: bool) -> Self {
        self.load_warnings = Some(v);
        self
    }

    pub fn break_on_error(mut self, v: bool) -> Self {
        self.break_on_error = Some(v);
        self
    }

    pub fn raise_on_error(mut self, v: bool) -> Self {
        self.raise_on_error = Some(v);
        self
    }

    pub fn rollback_on_error(mut self, v: bool) -> Self {
        self.rollback_on_error = Some(v);
        self
    }

    pub fn break_on_warning(mut self, v: bool) -> Self {
        self.break_on_warning = Some(v);
        self
    }

    pub fn raise_on_warning(mut self, v: bool) -> Self {
        self.raise_on_warning = Some(v);
        self
    }

    pub fn rollback_on_warning(mut self, v: bool) -> Self {
        self.rollback_on_warning = Some(v);
        self
    }

    /// Combina dos capas; los valores de `other` tienen precedencia.
    pub fn merge(&self, other: &ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides { use_transactions: other.use_transactions.or(self.use_transactions),
                          load_errors: other.load_errors.or(self.load_errors),
                          load_warnings: other.load_warnings.or(self.load_warnings),
                          break_on_error: other.break_on_error.or(self.break_on_error),
                          raise_on_error: other.raise_on_error.or(self.raise_on_error),
                          rollback_on_error: other.rollback_on_error.or(self.rollback_on_error),
                          break_on_warning: other.break_on_warning.or(self.break_on_warning),
                          raise_on_warning: other.raise_on_warning.or(self.raise_on_warning),
                          rollback_on_warning: other.rollback_on_warning.or(self.rollback_on_warning) }
    }
}
