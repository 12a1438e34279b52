//! Tests for effects and the reverse yield fold

use std::sync::{Arc, Mutex};

use serde_json::{json, Value as JsonValue};

use super::helpers::{ask, merge_vars, resume, run_fresh, show_var, text};
use crate::inject::Callback;
use crate::script::command::YieldFn;
use crate::script::{Command, ExecutionContext, Script};

/// Yield `{n: previous.n + 1}` and record `(label, vars.foo)` when called
fn counting_yield(label: &'static str, log: Arc<Mutex<Vec<(String, JsonValue)>>>) -> YieldFn {
    Callback::from_fn(move |(ctx, previous): (ExecutionContext, Option<JsonValue>)| {
        log.lock()
            .unwrap()
            .push((label.to_string(), ctx.vars["foo"].clone()));

        let previous = previous.unwrap_or_else(|| json!({ "n": 0 }));
        let n = previous["n"].as_i64().unwrap_or(0);
        Ok(json!({ "n": n + 1 }))
    })
}

fn set_foo(value: i64) -> Option<crate::script::command::VarsFn> {
    Some(Callback::from_fn(move |ctx: ExecutionContext| {
        let mut vars = ctx.vars;
        vars["foo"] = json!(value);
        Ok(vars)
    }))
}

#[tokio::test]
async fn test_yield_fold_runs_in_reverse() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let script = Script::builder("effects")
        .command(text("a"))
        .command(Command::effect(None, Some(counting_yield("E1", log.clone()))))
        .command(text("b"))
        .command(Command::effect(set_foo(1), Some(counting_yield("E2", log.clone()))))
        .command(text("c"))
        .command(Command::effect(set_foo(2), Some(counting_yield("E3", log.clone()))))
        .build()
        .unwrap();

    let result = run_fresh(script, json!({})).await.unwrap();

    assert!(result.finished);
    assert_eq!(result.contents, vec![json!("a"), json!("b"), json!("c")]);
    assert_eq!(result.yielded_value, Some(json!({ "n": 3 })));

    let calls = log.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            ("E3".to_string(), json!(2)),
            ("E2".to_string(), json!(1)),
            ("E1".to_string(), JsonValue::Null),
        ]
    );
}

#[tokio::test]
async fn test_last_yield_sees_none() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    let script = Script::builder("single")
        .command(Command::effect(
            None,
            Some(Callback::from_fn(move |(_, previous): (ExecutionContext, Option<JsonValue>)| {
                recorder.lock().unwrap().push(previous);
                Ok(json!("only"))
            })),
        ))
        .build()
        .unwrap();

    let result = run_fresh(script, json!({})).await.unwrap();

    assert_eq!(result.yielded_value, Some(json!("only")));
    assert_eq!(*seen.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn test_no_yields_means_no_yielded_value() {
    let script = Script::builder("quiet")
        .command(Command::effect(set_foo(5), None))
        .command(show_var("foo"))
        .build()
        .unwrap();

    let result = run_fresh(script, json!({})).await.unwrap();

    assert_eq!(result.contents, vec![json!(5)]);
    assert_eq!(result.yielded_value, None);
}

#[tokio::test]
async fn test_yield_fold_crosses_call_boundary() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let child = Script::builder("child")
        .command(Command::effect(set_foo(10), Some(counting_yield("child", log.clone()))))
        .build()
        .unwrap();

    let parent = Script::builder("parent")
        .command(Command::effect(set_foo(1), Some(counting_yield("before", log.clone()))))
        .command(Command::call("sub", child))
        .command(Command::effect(set_foo(2), Some(counting_yield("after", log.clone()))))
        .build()
        .unwrap();

    let result = run_fresh(parent, json!({})).await.unwrap();

    assert_eq!(result.yielded_value, Some(json!({ "n": 3 })));

    let order: Vec<String> = log.lock().unwrap().iter().map(|(l, _)| l.clone()).collect();
    assert_eq!(order, vec!["after", "child", "before"]);
}

#[tokio::test]
async fn test_yield_is_per_call() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let script = Script::builder("turns")
        .command(Command::effect(set_foo(1), Some(counting_yield("first", log.clone()))))
        .command(ask("wait"))
        .command(Command::effect(set_foo(2), Some(counting_yield("second", log.clone()))))
        .command(Command::effect(set_foo(3), Some(counting_yield("third", log.clone()))))
        .build()
        .unwrap();

    let first = run_fresh(script, json!({})).await.unwrap();

    assert!(!first.finished);
    assert_eq!(first.yielded_value, Some(json!({ "n": 1 })));

    let second = resume(first, None).await.unwrap();

    assert!(second.finished);
    assert_eq!(second.yielded_value, Some(json!({ "n": 2 })));

    let order: Vec<String> = log.lock().unwrap().iter().map(|(l, _)| l.clone()).collect();
    assert_eq!(order, vec!["first", "third", "second"]);
}

#[tokio::test]
async fn test_yield_collects_values() {
    // Each effect prepends its item, so the fold rebuilds execution order
    fn push_item(item: &'static str) -> Command {
        Command::effect(
            None,
            Some(Callback::from_fn(move |(_, previous): (ExecutionContext, Option<JsonValue>)| {
                let mut items = vec![json!(item)];
                if let Some(JsonValue::Array(rest)) = previous {
                    items.extend(rest);
                }
                Ok(JsonValue::Array(items))
            })),
        )
    }

    let script = Script::builder("collect")
        .command(push_item("x"))
        .command(Command::prompt("noop", Some(merge_vars())))
        .build()
        .unwrap();

    let script_b = Script::builder("collect_b")
        .command(push_item("x"))
        .command(push_item("y"))
        .command(push_item("z"))
        .build()
        .unwrap();

    let suspended = run_fresh(script, json!({})).await.unwrap();
    assert_eq!(suspended.yielded_value, Some(json!(["x"])));

    let finished = run_fresh(script_b, json!({})).await.unwrap();
    assert_eq!(finished.yielded_value, Some(json!(["x", "y", "z"])));
}
