use std::sync::{Arc, Mutex};

use serde_json::json;
use svc_core::{ConfigOverrides, DefinitionError, FieldSpec, Phase, ServiceDefinition, StepSpec};

fn noop(name: &str) -> StepSpec {
    StepSpec::new(name, |_| Ok(()))
}

fn tagging(name: &'static str, tag: &'static str, log: &Arc<Mutex<Vec<String>>>) -> StepSpec {
    let log = Arc::clone(log);
    StepSpec::new(name, move |_| {
        log.lock().unwrap().push(format!("{name}:{tag}"));
        Ok(())
    })
}

#[test]
fn child_inherits_and_reorders_steps() {
    let base = ServiceDefinition::builder("Base").step(noop("a")).step(noop("c")).step(noop("e")).build().unwrap();
    let child = ServiceDefinition::extend(&base, "Child").step(noop("b").before("c"))
                                                         .step(noop("d").after("b"))
                                                         .build()
                                                         .unwrap();
    assert_eq!(child.plan().step_names(Phase::Main), vec!["a", "b", "d", "c", "e"]);
    assert_eq!(base.plan().step_names(Phase::Main), vec!["a", "c", "e"]);
    assert_eq!(child.ancestry(), vec!["Base", "Child"]);
    assert_ne!(child.plan().plan_hash(), base.plan().plan_hash());
}

#[test]
fn grandchild_overrides_win() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let root = ServiceDefinition::builder("Root").argument(FieldSpec::argument("greeting").default("hi"))
                                                 .step(tagging("greet", "root", &log))
                                                 .step(tagging("farewell", "root", &log))
                                                 .build()
                                                 .unwrap();
    let mid = ServiceDefinition::extend(&root, "Mid").step(tagging("greet", "mid", &log))
                                                     .argument(FieldSpec::argument("greeting").default("hello"))
                                                     .build()
                                                     .unwrap();
    let leaf = ServiceDefinition::extend(&mid, "Leaf").step(tagging("greet", "leaf", &log))
                                                      .remove_step("farewell")
                                                      .argument(FieldSpec::argument("greeting").default("hey"))
                                                      .build()
                                                      .unwrap();
    let result = leaf.run(json!({})).unwrap();
    assert_eq!(result.argument("greeting"), Some(&json!("hey")));
    assert_eq!(*log.lock().unwrap(), vec!["greet:leaf"]);

    log.lock().unwrap().clear();
    mid.run(json!({})).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["greet:mid", "farewell:root"]);
}

#[test]
fn config_overrides_cascade_down_the_chain() {
    let base = ServiceDefinition::builder("Base").config(ConfigOverrides::new().break_on_error(false).load_warnings(false))
                                                 .build()
                                                 .unwrap();
    let child = ServiceDefinition::extend(&base, "Child").config(ConfigOverrides::new().break_on_error(true))
                                                         .build()
                                                         .unwrap();
    assert_eq!(child.config_overrides().break_on_error, Some(true));
    assert_eq!(child.config_overrides().load_warnings, Some(false));
}

#[test]
fn hooks_can_be_removed_by_children() {
    let base = ServiceDefinition::builder("Base").before_hook(noop("audit"))
                                                 .finally_hook(noop("close"))
                                                 .build()
                                                 .unwrap();
    let child = ServiceDefinition::extend(&base, "Child").remove_hook(Phase::Before, "audit").build().unwrap();
    assert!(child.plan().step_names(Phase::Before).is_empty());
    assert_eq!(child.plan().step_names(Phase::Finally), vec!["close"]);
}

#[test]
fn definition_errors() {
    assert_eq!(ServiceDefinition::builder("  ").build().unwrap_err(), DefinitionError::EmptyName);
    let err = ServiceDefinition::builder("Bad").step(noop("x").after("missing")).build().unwrap_err();
    assert!(matches!(err, DefinitionError::UnknownAnchor { anchor, .. } if anchor == "missing"));
    let err = ServiceDefinition::builder("Bad").step(noop("a"))
                                               .step(noop("x").before("a").after("a"))
                                               .build()
                                               .unwrap_err();
    assert!(matches!(err, DefinitionError::ConflictingAnchors { .. }));
}
