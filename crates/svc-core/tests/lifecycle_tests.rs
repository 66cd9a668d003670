use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use svc_core::event::{ExecutionEventKind, SkipReason};
use svc_core::{ConfigOverrides, FieldSpec, InvocationState, Phase, ServiceDefinition, ServiceError, StepSpec, TypeConstraint};

type Log = Arc<Mutex<Vec<String>>>;

fn logging(log: &Log, name: &'static str) -> StepSpec {
    let log = Arc::clone(log);
    StepSpec::new(name, move |_| {
        log.lock().unwrap().push(name.to_string());
        Ok(())
    })
}

fn failing(log: &Log, name: &'static str) -> StepSpec {
    let log = Arc::clone(log);
    StepSpec::new(name, move |ctx| {
        log.lock().unwrap().push(name.to_string());
        ctx.add_error("base", format!("{name} failed"))
    })
}

#[test]
fn phases_run_in_order() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Ordered").before_hook(logging(&log, "before"))
                                                   .step(logging(&log, "a"))
                                                   .step(logging(&log, "b"))
                                                   .after_hook(logging(&log, "after"))
                                                   .finally_hook(logging(&log, "finally"))
                                                   .build()
                                                   .unwrap();
    let result = def.run(json!({})).unwrap();
    assert!(result.succeeded());
    assert_eq!(result.state(), InvocationState::Succeeded);
    assert_eq!(*log.lock().unwrap(), vec!["before", "a", "b", "after", "finally"]);
    assert_eq!(result.executed_steps(Phase::Main), vec!["a", "b"]);
}

#[test]
fn break_on_error_skips_rest_but_finally_runs() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Breaking").step(logging(&log, "a"))
                                                    .step(failing(&log, "b"))
                                                    .step(logging(&log, "c"))
                                                    .after_hook(logging(&log, "after"))
                                                    .finally_hook(logging(&log, "finally"))
                                                    .build()
                                                    .unwrap();
    let result = def.run(json!({})).unwrap();
    assert!(result.failed());
    assert_eq!(result.state(), InvocationState::Failed);
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "finally"]);
    assert!(result.events().iter().any(|e| matches!(&e.kind,
        ExecutionEventKind::StepSkipped { step, reason: SkipReason::Halted, .. } if step == "c")));
    assert!(result.events().iter().any(|e| matches!(&e.kind,
        ExecutionEventKind::StepSkipped { step, reason: SkipReason::Failed, .. } if step == "after")));
}

#[test]
fn without_break_all_main_steps_run() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Collecting").step(failing(&log, "a"))
                                                      .step(failing(&log, "b"))
                                                      .config(ConfigOverrides::new().break_on_error(false))
                                                      .build()
                                                      .unwrap();
    let result = def.run(json!({})).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    assert_eq!(result.errors().get("base").len(), 2);
}

#[test]
fn always_steps_run_after_break() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Always").step(failing(&log, "a"))
                                                  .step(logging(&log, "b"))
                                                  .step(logging(&log, "cleanup").always())
                                                  .build()
                                                  .unwrap();
    def.run(json!({})).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["a", "cleanup"]);
}

#[test]
fn done_stops_main_without_failing() {
    let log: Log = Log::default();
    let stop = StepSpec::new("stop", |ctx| {
        ctx.done();
        Ok(())
    });
    let def = ServiceDefinition::builder("Early").step(stop)
                                                 .step(logging(&log, "never"))
                                                 .after_hook(logging(&log, "after"))
                                                 .build()
                                                 .unwrap();
    let result = def.run(json!({})).unwrap();
    assert!(result.succeeded());
    assert_eq!(*log.lock().unwrap(), vec!["after"]);
}

#[test]
fn guards_use_argument_presence() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Guarded").argument(FieldSpec::argument("flag").optional())
                                                   .step(logging(&log, "with_flag").when("flag"))
                                                   .step(logging(&log, "without_flag").unless("flag"))
                                                   .step(logging(&log, "computed").when_with(|ctx| ctx.arg("flag") == Some(&json!(2))))
                                                   .build()
                                                   .unwrap();
    def.run(json!({"flag": ""})).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["without_flag"]);
    log.lock().unwrap().clear();
    def.run(json!({"flag": 2})).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["with_flag", "computed"]);
}

#[test]
fn contract_failures_are_fatal_before_any_step() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Typed").argument(FieldSpec::argument("n").typed(TypeConstraint::Integer))
                                                 .step(logging(&log, "a"))
                                                 .finally_hook(logging(&log, "finally"))
                                                 .build()
                                                 .unwrap();
    assert!(matches!(def.run(json!({})), Err(ServiceError::MissingArgument { .. })));
    assert!(matches!(def.run(json!({"n": "x"})), Err(ServiceError::TypeMismatch { .. })));
    assert!(matches!(def.run(json!([1])), Err(ServiceError::InvalidRawInputShape { .. })));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn raise_unwinds_with_snapshot_and_runs_finally() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Raising").step(StepSpec::new("warn", |ctx| ctx.add_warning("w", "careful")))
                                                   .step(failing(&log, "boom"))
                                                   .step(logging(&log, "never"))
                                                   .finally_hook(logging(&log, "finally"))
                                                   .config(ConfigOverrides::new().raise_on_error(true))
                                                   .build()
                                                   .unwrap();
    let err = def.run(json!({})).unwrap_err();
    match err {
        ServiceError::Raised { service, field, errors, warnings, .. } => {
            assert_eq!(service, "Raising");
            assert_eq!(field, "base");
            assert_eq!(errors["base"], vec![json!("boom failed")]);
            assert_eq!(warnings["w"], vec![json!("careful")]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(*log.lock().unwrap(), vec!["boom", "finally"]);
}

#[test]
fn run_strict_turns_errors_into_failures() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Strict").step(failing(&log, "a")).build().unwrap();
    assert!(def.runner().run_strict(json!({})).unwrap_err().is_raised());
    let ok = ServiceDefinition::builder("Fine").step(logging(&log, "a")).build().unwrap();
    assert!(ok.runner().run_strict(json!({})).is_ok());
}

#[test]
fn finally_cannot_clear_a_failure() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Sneaky").step(failing(&log, "a"))
                                                  .finally_hook(StepSpec::new("wipe", |ctx| {
                                                      ctx.errors_mut().remove("base");
                                                      Ok(())
                                                  }))
                                                  .build()
                                                  .unwrap();
    let result = def.run(json!({})).unwrap();
    assert!(result.failed());
    assert_eq!(result.state(), InvocationState::Failed);
}

#[test]
fn outputs_defaults_and_typed_keys() {
    const WORD: svc_core::Key<String> = svc_core::Key::new("word");
    let def = ServiceDefinition::builder("Words").argument(FieldSpec::argument("letters").typed(TypeConstraint::array_of(TypeConstraint::String)))
                                                 .output(FieldSpec::output("word").typed(TypeConstraint::String).default(""))
                                                 .step(StepSpec::new("join", |ctx| {
                                                     let letters: Vec<String> = ctx.arg_as("letters")?;
                                                     let mut word = ctx.get(&WORD)?;
                                                     word.push_str(&letters.concat());
                                                     ctx.set(&WORD, &word)
                                                 }))
                                                 .build()
                                                 .unwrap();
    let result = def.run(json!({"letters": ["o", "k"]})).unwrap();
    assert_eq!(result.get(&WORD).unwrap(), "ok");
    assert_eq!(result.output("word"), Some(&Value::from("ok")));
}

#[test]
fn events_are_sequenced_and_bracketed() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Traced").step(logging(&log, "a")).build().unwrap();
    let result = def.run(json!({})).unwrap();
    let events = result.events();
    assert!(matches!(events.first().map(|e| &e.kind), Some(ExecutionEventKind::InvocationStarted { .. })));
    assert!(matches!(events.last().map(|e| &e.kind),
                     Some(ExecutionEventKind::InvocationFinished { state: InvocationState::Succeeded })));
    assert!(events.iter().enumerate().all(|(i, e)| e.seq == i as u64 && e.invocation_id == result.invocation_id()));
    assert_eq!(events[0].kind,
               ExecutionEventKind::InvocationStarted { service: "Traced".into(),
                                                       plan_hash: result.plan_hash().to_string(),
                                                       parent: None });
}

#[test]
fn break_on_warning_stops_main_without_failing() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Wary").output(FieldSpec::output("o").optional())
                                                .step(StepSpec::new("warn", |ctx| ctx.add_warning("w", "careful")))
                                                .step(StepSpec::new("set", |ctx| ctx.set_output("o", 1)))
                                                .after_hook(logging(&log, "after"))
                                                .config(ConfigOverrides::new().break_on_warning(true))
                                                .build()
                                                .unwrap();
    let result = def.run(json!({})).unwrap();
    assert!(result.succeeded());
    assert_eq!(result.output("o"), None);
    assert_eq!(result.warnings().get("w"), vec![&json!("careful")]);
    assert_eq!(*log.lock().unwrap(), vec!["after"]);
    assert!(result.events().iter().any(|e| matches!(&e.kind,
        ExecutionEventKind::StepSkipped { step, reason: SkipReason::Halted, .. } if step == "set")));
}

#[test]
fn raise_on_warning_unwinds() {
    let log: Log = Log::default();
    let def = ServiceDefinition::builder("Touchy").step(StepSpec::new("warn", |ctx| ctx.add_warning("w", "careful")))
                                                  .step(logging(&log, "never"))
                                                  .config(ConfigOverrides::new().raise_on_warning(true))
                                                  .build()
                                                  .unwrap();
    match def.run(json!({})).unwrap_err() {
        ServiceError::Raised { kind, field, warnings, .. } => {
            assert_eq!(kind, svc_core::MessageKind::Warning);
            assert_eq!(field, "w");
            assert_eq!(warnings["w"], vec![json!("careful")]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(log.lock().unwrap().is_empty());
}
