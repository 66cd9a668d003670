use std::sync::Arc;
use std::thread;

use serde_json::json;
use svc_core::{ConfigOverrides, FieldSpec, ServiceDefinition, ServiceError, ServiceRegistry, StepSpec, TypeConstraint};

fn child_service() -> Arc<ServiceDefinition> {
    ServiceDefinition::builder("Child").argument(FieldSpec::argument("actor").optional())
                                       .argument(FieldSpec::argument("n").typed(TypeConstraint::Integer))
                                       .output(FieldSpec::output("seen_actor"))
                                       .step(StepSpec::new("record", |ctx| {
                                           let actor = ctx.arg("actor").cloned().unwrap_or_default();
                                           ctx.set_output("seen_actor", actor)
                                       }))
                                       .step(StepSpec::new("check", |ctx| {
                                           ctx.add_warning("n", "checked")?;
                                           if ctx.arg_as::<i64>("n")? < 0 {
                                               ctx.add_error("n", "must be positive")?;
                                           }
                                           Ok(())
                                       }))
                                       .build()
                                       .unwrap()
}

fn parent_service(child: Arc<ServiceDefinition>, overrides: ConfigOverrides, load_errors: bool) -> Arc<ServiceDefinition> {
    ServiceDefinition::builder("Parent").argument(FieldSpec::argument("actor").context())
                                        .argument(FieldSpec::argument("n"))
                                        .output(FieldSpec::output("child_actor"))
                                        .step(StepSpec::new("delegate", move |ctx| {
                                            let n = ctx.arg("n").cloned().unwrap_or_default();
                                            let result = ctx.call(&child)
                                                            .load_errors(load_errors)
                                                            .config(overrides)
                                                            .run(json!({ "n": n }))?;
                                            let actor = result.output("seen_actor").cloned().unwrap_or_default();
                                            ctx.set_output("child_actor", actor)
                                        }))
                                        .step(StepSpec::new("after_delegate", |ctx| ctx.add_warning("trail", "reached")))
                                        .build()
                                        .unwrap()
}

#[test]
fn context_arguments_are_forwarded() {
    let parent = parent_service(child_service(), ConfigOverrides::new(), true);
    let result = parent.run(json!({"actor": "ada", "n": 1})).unwrap();
    assert_eq!(result.output("child_actor"), Some(&json!("ada")));
}

#[test]
fn child_messages_propagate_and_break_parent() {
    let parent = parent_service(child_service(), ConfigOverrides::new(), true);
    let result = parent.run(json!({"actor": "ada", "n": -1})).unwrap();
    assert!(result.failed());
    assert_eq!(result.errors().get("n"), vec![&json!("must be positive")]);
    assert_eq!(result.warnings().get("n"), vec![&json!("checked")]);
    // El break del padre detiene el step siguiente.
    assert!(!result.warnings().key_present("trail"));
}

#[test]
fn load_errors_false_keeps_parent_clean() {
    let parent = parent_service(child_service(), ConfigOverrides::new(), false);
    let result = parent.run(json!({"actor": "ada", "n": -1})).unwrap();
    assert!(result.succeeded());
    assert!(result.warnings().key_present("trail"));
}

#[test]
fn raise_in_child_unwinds_through_parent() {
    let parent = parent_service(child_service(), ConfigOverrides::new().raise_on_error(true), true);
    let err = parent.run(json!({"actor": "ada", "n": -1})).unwrap_err();
    match err {
        ServiceError::Raised { service, errors, .. } => {
            assert_eq!(service, "Child");
            assert_eq!(errors["n"], vec![json!("must be positive")]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn child_records_parent_link() {
    let child = child_service();
    let linked = Arc::clone(&child);
    let parent = ServiceDefinition::builder("Parent").output(FieldSpec::output("link"))
                                                     .step(StepSpec::new("call", move |ctx| {
                                                         let parent_id = ctx.invocation_id();
                                                         let result = ctx.call(&linked).run(json!({"n": 1}))?;
                                                         let link = result.parent().cloned().ok_or_else(|| ServiceError::step("no link"))?;
                                                         assert_eq!(link.invocation_id, parent_id);
                                                         ctx.set_output("link", link.service)
                                                     }))
                                                     .build()
                                                     .unwrap();
    let result = parent.run(json!({})).unwrap();
    assert_eq!(result.output("link"), Some(&json!("Parent")));
    assert!(child.run(json!({"n": 1})).unwrap().parent().is_none());
}

#[test]
fn detached_runs_do_not_propagate() {
    let child = child_service();
    let parent = ServiceDefinition::builder("Parent").step(StepSpec::new("spawn", move |ctx| {
                                                         let result = ctx.run_detached(&child, json!({"n": -5}))?;
                                                         assert!(result.failed());
                                                         assert!(result.parent().is_none());
                                                         Ok(())
                                                     }))
                                                     .build()
                                                     .unwrap();
    assert!(parent.run(json!({})).unwrap().succeeded());
}

#[test]
fn registry_runs_by_name() {
    let registry = ServiceRegistry::new();
    registry.register(child_service()).unwrap();
    assert!(registry.register(child_service()).is_err());
    assert_eq!(registry.names(), vec!["Child".to_string()]);
    assert!(registry.run("Child", json!({"n": 3})).unwrap().succeeded());
    assert!(matches!(registry.run("Nope", json!({})), Err(ServiceError::UnknownService(_))));
}

#[test]
fn concurrent_invocations_are_independent() {
    let def = child_service();
    let handles: Vec<_> = (0..8).map(|i| {
                                    let def = Arc::clone(&def);
                                    thread::spawn(move || {
                                        let n = if i % 2 == 0 { i } else { -i };
                                        def.run(json!({"n": n, "actor": i})).unwrap()
                                    })
                                })
                                .collect();
    for (i, h) in handles.into_iter().enumerate() {
        let result = h.join().unwrap();
        assert_eq!(result.succeeded(), i % 2 == 0);
        assert_eq!(result.output("seen_actor"), Some(&json!(i)));
        assert_eq!(result.warnings().len(), 1);
    }
}
