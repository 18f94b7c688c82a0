use serde_json::json;
use stepflow::core::runner::substitution::has_placeholder;
use stepflow::core::runner::{PipeRegistry, SubstitutionEngine};
use stepflow::core::types::ErrorCategory;

fn engine() -> SubstitutionEngine {
    SubstitutionEngine::default()
}

#[test]
fn test_simple_variable() {
    let result = engine().substitute(&json!("{{var}}"), &json!({"var": "x"})).unwrap();
    assert_eq!(result, Some(json!("x")));
}

#[test]
fn test_whole_string_keeps_native_type() {
    let data = json!({"x": 1, "flags": [true, false], "cfg": {"port": 8080}});
    let call = json!({"var": "{{x}}", "flags": "{{ flags }}", "cfg": "{{cfg}}"});

    let result = engine().substitute(&call, &data).unwrap();

    assert_eq!(
        result,
        Some(json!({"var": 1, "flags": [true, false], "cfg": {"port": 8080}}))
    );
}

#[test]
fn test_partial_match_splices_text() {
    let data = json!({"host": "localhost", "port": 8080, "ok": true});
    let call = json!({"url": "http://{{host}}:{{port}}/health?ok={{ok}}"});

    let result = engine().substitute(&call, &data).unwrap().unwrap();

    assert_eq!(result["url"], json!("http://localhost:8080/health?ok=true"));
}

#[test]
fn test_nested_paths_and_pipes() {
    let data = json!({"a": {"b": [10, 20]}, "n": "3.7", "name": " Ann "});
    let call = json!({
        "first": "{{a.b[0]}}",
        "last": "{{a.b[-1]}}",
        "rounded": "{{n|float|round:0}}",
        "name": "{{ name | trim | upper }}",
    });

    let result = engine().substitute(&call, &data).unwrap().unwrap();

    assert_eq!(result["first"], json!(10));
    assert_eq!(result["last"], json!(20));
    assert_eq!(result["rounded"], json!(4.0));
    assert_eq!(result["name"], json!("ANN"));
}

#[test]
fn test_sequences_and_nested_mappings() {
    let data = json!({"user": "bo", "id": 7});
    let call = json!({"args": ["--user", "{{user}}", "--id={{id}}"], "meta": {"who": "{{user}}"}});

    let result = engine().substitute(&call, &data).unwrap().unwrap();

    assert_eq!(result["args"], json!(["--user", "bo", "--id=7"]));
    assert_eq!(result["meta"], json!({"who": "bo"}));
}

#[test]
fn test_no_placeholder_means_no_change() {
    let call = json!({"a": 1, "b": "plain", "c": ["x", {"d": null}], "e": "{{ not valid + }}"});
    assert_eq!(engine().substitute(&call, &json!({})).unwrap(), None);

    let mut value = call.clone();
    assert!(!engine().substitute_in_place(&mut value, &json!({})).unwrap());
    assert_eq!(value, call);
}

#[test]
fn test_substitution_is_idempotent() {
    let data = json!({"x": 1, "greeting": "hi {{name}}", "name": "ann"});
    let call = json!({"var": "{{x}}", "text": "{{greeting}}!"});

    let once = engine().substitute(&call, &data).unwrap().unwrap();
    assert_eq!(once, json!({"var": 1, "text": "hi ann!"}));
    assert_eq!(engine().substitute(&once, &data).unwrap(), None);
}

#[test]
fn test_fixpoint_resolves_chained_references() {
    let data = json!({"a": "{{b}}", "b": "{{c}}", "c": 42});
    let result = engine().substitute(&json!({"v": "{{a}}"}), &data).unwrap().unwrap();
    assert_eq!(result["v"], json!(42));
}

#[test]
fn test_self_reference_does_not_converge() {
    let data = json!({"x": "{{x}}"});
    let err = engine().substitute(&json!({"v": "{{x}}"}), &data).unwrap_err();

    assert_eq!(err.category, ErrorCategory::VariableResolutionError);
    assert_eq!(err.code, "STEP-VAR-004");
    assert_eq!(err.context.get("context").map(String::as_str), Some("call.v"));
}

#[test]
fn test_self_reference_that_grows_fails_fast() {
    let data = json!({"x": "{{x}}{{x}}"});
    let started = std::time::Instant::now();

    let err = engine().substitute(&json!({"v": "{{x}}"}), &data).unwrap_err();

    assert_eq!(err.code, "STEP-VAR-004");
    assert_eq!(err.context.get("context").map(String::as_str), Some("call.v"));
    assert!(err.message.contains("x -> x"));
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
}

#[test]
fn test_indirect_cycle_is_reported_with_its_chain() {
    let data = json!({"a": "pre {{b}}", "b": ["{{ c | str }}"], "c": "{{a}}!"});
    let err = engine()
        .substitute(&json!({"args": ["{{c}}"]}), &data)
        .unwrap_err();

    assert_eq!(err.code, "STEP-VAR-004");
    assert!(err.message.contains("c -> a -> b -> c"));
    assert_eq!(
        err.context.get("context").map(String::as_str),
        Some("call.args[0]")
    );
}

#[test]
fn test_pass_bound_is_configurable() {
    let data = json!({"a": "{{b}}", "b": "{{c}}", "c": 1});
    let call = json!({"v": "{{a}}"});

    let tight = SubstitutionEngine::new(PipeRegistry::default(), 2);
    assert_eq!(tight.substitute(&call, &data).unwrap_err().code, "STEP-VAR-004");

    let enough = SubstitutionEngine::new(PipeRegistry::default(), 3);
    assert_eq!(enough.substitute(&call, &data).unwrap().unwrap()["v"], json!(1));

    assert_eq!(SubstitutionEngine::new(PipeRegistry::default(), 0).max_passes(), 1);
}

#[test]
fn test_missing_key_is_an_error_not_empty() {
    let err = engine()
        .substitute(&json!({"q": "value={{missing}}"}), &json!({"present": 1}))
        .unwrap_err();

    assert_eq!(err.code, "STEP-VAR-001");
    assert!(err.message.contains("missing"));
    assert_eq!(err.context.get("context").map(String::as_str), Some("call.q"));
}

#[test]
fn test_sequence_locations_in_errors() {
    let err = engine()
        .substitute(&json!({"args": ["ok", "{{nope}}"]}), &json!({}))
        .unwrap_err();
    assert_eq!(
        err.context.get("context").map(String::as_str),
        Some("call.args[1]")
    );
}

#[test]
fn test_pipe_errors_surface() {
    let data = json!({"s": "abc"});

    let unknown = engine().substitute(&json!("{{s|reverse}}"), &data).unwrap_err();
    assert_eq!(unknown.code, "STEP-PIPE-001");

    let empty = engine().substitute(&json!("{{s|}}"), &data).unwrap_err();
    assert_eq!(empty.code, "STEP-PIPE-001");

    let failed = engine().substitute(&json!("{{s|int}}"), &data).unwrap_err();
    assert_eq!(failed.category, ErrorCategory::PipeError);
}

#[test]
fn test_placeholder_grammar() {
    assert!(has_placeholder("{{a}}"));
    assert!(has_placeholder("pre {{ a.b[-1] | round:2 }} post"));
    assert!(!has_placeholder("{{ a/b }}"));
    assert!(!has_placeholder("{ {a} }"));
}
