//! Invariants that hold for every template and context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use markup_core::{Template, Value};
use markup_renderer::{Registry, Renderer};
use rstest::rstest;
use serde_json::json;

fn render_on(registry: &Registry, source: &str, ctx: &Value) -> String {
    let template = Template::parse(source).expect("parse");
    Renderer::new(registry).render(&template, ctx)
}

#[test]
fn rendering_is_idempotent() {
    let registry = Registry::new();
    let template = Template::parse("{{list|sort}}{{#}}:{{.|upcase}} {{/list}}{{if x}}x{{else}}-{{/if}}")
        .expect("parse");
    let ctx = Value::from(json!({"list": ["b", "a"], "x": 0}));
    let renderer = Renderer::new(&registry);
    let first = renderer.render(&template, &ctx);
    assert_eq!(first, "0:A 1:B x");
    assert_eq!(renderer.render(&template, &ctx), first);
}

#[test]
fn absent_subjects_never_reach_their_pipes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = Registry::new();
    registry
        .register_pipe("observe", move |v, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(v.clone())
        })
        .expect("register");

    let ctx = Value::from(json!({"present": 1}));
    assert_eq!(render_on(&registry, "{{missing|observe}}", &ctx), "???");
    assert_eq!(render_on(&registry, "{{missing|observe}}x{{/missing}}", &ctx), "");
    assert_eq!(render_on(&registry, "{{if missing|observe}}y{{else}}n{{/if}}", &ctx), "n");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(render_on(&registry, "{{present|observe}}", &ctx), "1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn null_is_distinct_from_absent() {
    let registry = Registry::new();
    let ctx = Value::from(json!({"race": null}));
    assert_eq!(render_on(&registry, "[{{race}}]", &ctx), "[]");
    assert_eq!(render_on(&registry, "[{{race|blank>N/A}}]", &ctx), "[N/A]");
    assert_eq!(render_on(&registry, "[{{other|blank>N/A}}]", &ctx), "[???]");
}

#[rstest]
#[case("equals>5", "notequals>5")]
#[case("more>4", "more>5")]
#[case("less>6", "less>5")]
#[case("ormore>5", "ormore>6")]
#[case("orless>5", "orless>4")]
#[case("between>1>9", "between>6>9")]
#[case("like>5*", "like>6*")]
#[case("notlike>6*", "notlike>5*")]
#[case("odd", "even")]
#[case("divisible>5", "divisible>2")]
fn predicates_pass_input_or_yield_false(#[case] passing: &str, #[case] failing: &str) {
    let registry = Registry::new();
    let ctx = Value::from(json!({"n": 5}));
    assert_eq!(render_on(&registry, &format!("{{{{n|{passing}}}}}"), &ctx), "5");
    assert_eq!(render_on(&registry, &format!("{{{{n|{failing}}}}}"), &ctx), "false");
    assert_eq!(render_on(&registry, &format!("{{{{n|{failing}|upcase}}}}"), &ctx), "FALSE");
}

#[test]
fn same_name_sections_nest_to_any_depth() {
    let registry = Registry::new();
    let ctx = Value::from(json!({
        "a": {"v": 1, "a": {"v": 2, "a": {"v": 3}}}
    }));
    let out = render_on(&registry, "{{a}}{{v}}{{a}}{{v}}{{a}}{{v}}{{/a}}{{/a}}|{{/a}}", &ctx);
    assert_eq!(out, "123|");
}

#[test]
fn counters_follow_the_nearest_iteration() {
    let registry = Registry::new();
    let ctx = Value::from(json!({
        "rows": [{"cells": ["a", "b"]}, {"cells": ["c"]}]
    }));
    let out = render_on(
        &registry,
        "{{rows}}{{##}}:{{cells}}{{#}}{{.}}{{/cells}};{{/rows}}",
        &ctx,
    );
    assert_eq!(out, "1:0a1b;2:0c;");
}

#[test]
fn templates_render_concurrently() {
    let mut registry = Registry::new();
    registry.register_include("row", "<{{.}}>").expect("include");
    registry.seal();
    let registry = Arc::new(registry);
    let template = Arc::new(Template::parse("{{items}}{{row}}{{/items}}").expect("parse"));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let template = Arc::clone(&template);
            thread::spawn(move || {
                let ctx = Value::from(json!({"items": [i, i + 1]}));
                Renderer::new(&registry).render(&template, &ctx)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().expect("thread"), format!("<{i}><{}>", i + 1));
    }
}
