//! `BuildWord`: concatena letras y un símbolo opcional.
//!
//! - `validate_letters` rechaza (como error de negocio, no fatal) letras que
//!   no sean strings de un carácter.
//! - `add_letters` concatena sobre el output `word` (default `""`).
//! - `add_symbol_if_present` sólo corre si llega `symbol`.
//!
//! `BuildShout` hereda de `BuildWord`, pasa la palabra a mayúsculas tras
//! `add_letters` y usa `"!"` como símbolo por defecto.

use std::sync::Arc;

use serde_json::Value;
use svc_core::{DefinitionError, FieldSpec, Key, ServiceCtx, ServiceDefinition, StepResult, StepSpec, TypeConstraint};

pub const LETTERS: Key<Vec<String>> = Key::new("letters");
pub const SYMBOL: Key<Option<String>> = Key::new("symbol");
pub const WORD: Key<String> = Key::new("word");

pub fn build_word() -> Result<Arc<ServiceDefinition>, DefinitionError> {
    ServiceDefinition::builder("BuildWord").argument(FieldSpec::argument("letters").typed(TypeConstraint::Array))
                                           .argument(FieldSpec::argument("symbol").typed(TypeConstraint::String).optional())
                                           .output(FieldSpec::output("word").typed(TypeConstraint::String).default(""))
                                           .step(StepSpec::new("validate_letters", validate_letters))
                                           .step(StepSpec::new("add_letters", add_letters))
                                           .step(StepSpec::new("add_symbol_if_present", add_symbol).when("symbol"))
                                           .build()
}

pub fn build_shout(word: &Arc<ServiceDefinition>) -> Result<Arc<ServiceDefinition>, DefinitionError> {
    ServiceDefinition::extend(word, "BuildShout").argument(FieldSpec::argument("symbol").typed(TypeConstraint::String).default("!"))
                                                 .step(StepSpec::new("uppercase", uppercase).after("add_letters"))
                                                 .build()
}

fn validate_letters(ctx: &mut ServiceCtx<'_>) -> StepResult {
    let letters = ctx.arg("letters").and_then(Value::as_array).cloned().unwrap_or_default();
    for (i, letter) in letters.iter().enumerate() {
        let ok = letter.as_str().is_some_and(|s| s.chars().count() == 1);
        if !ok {
            ctx.add_error("letters", format!("item {i} must be a single-character string, got {letter}"))?;
        }
    }
    Ok(())
}

fn add_letters(ctx: &mut ServiceCtx<'_>) -> StepResult {
    let letters = ctx.get(&LETTERS)?;
    let mut word = ctx.get(&WORD)?;
    word.extend(letters);
    ctx.set(&WORD, &word)
}

fn add_symbol(ctx: &mut ServiceCtx<'_>) -> StepResult {
    let Some(symbol) = ctx.get(&SYMBOL)? else { return Ok(()) };
    let word = ctx.get(&WORD)? + &symbol;
    ctx.set(&WORD, &word)
}

fn uppercase(ctx: &mut ServiceCtx<'_>) -> StepResult {
    let word = ctx.get(&WORD)?.to_uppercase();
    ctx.set(&WORD, &word)
}
