//! Composition of context, domain and group-by fragment lists.

use quill_eval::{
    evaluate_domains_and_contexts, evaluate_fragments, normalize_domain, CompositionSource,
    FragmentKind,
};
use serde_json::{json, Map, Value as Json};

fn compose(kind: FragmentKind, fragments: Json, base: Json) -> Json {
    let fragments = fragments.as_array().cloned().unwrap_or_default();
    let base = base.as_object().cloned().unwrap_or_default();
    evaluate_fragments(kind, &fragments, &base).unwrap()
}

#[test]
fn context_fragments_see_earlier_siblings() {
    assert_eq!(
        compose(FragmentKind::Context, json!(["a = 1", "b = a + 1"]), json!({})),
        json!({"a": 1, "b": 2})
    );
}

#[test]
fn context_fragments_override_left_to_right() {
    let result = compose(
        FragmentKind::Context,
        json!([
            {"lang": "en_US", "tz": "UTC"},
            "{'lang': 'fr_FR', 'uid_plus': uid + 1}",
            {"__ref": "context", "__debug": "{'tz': tz.lower()}"}
        ]),
        json!({"uid": 41, "tz": "Europe/Brussels"}),
    );
    assert_eq!(
        result,
        json!({"lang": "fr_FR", "tz": "utc", "uid_plus": 42})
    );
}

#[test]
fn base_context_is_not_part_of_result() {
    let result = compose(FragmentKind::Context, json!(["{'x': uid}"]), json!({"uid": 3}));
    assert_eq!(result, json!({"x": 3}));
}

#[test]
fn one_bad_fragment_fails_the_whole_composition() {
    let fragments = vec![json!({"a": 1}), json!("{'b': missing}")];
    let err = evaluate_fragments(FragmentKind::Context, &fragments, &Map::new()).unwrap_err();
    assert_eq!(err.kind(), "NameError");

    let err = evaluate_fragments(FragmentKind::Context, &[json!("[1]")], &Map::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: context fragment must evaluate to a dict, not list"
    );
}

#[test]
fn nested_compound_contexts() {
    let result = compose(
        FragmentKind::Context,
        json!([{
            "__ref": "compound_context",
            "__eval_context": {
                "__ref": "compound_context",
                "__eval_context": {"base": 10},
                "__contexts": ["{'inner': base * 2}"]
            },
            "__contexts": ["{'outer': inner + 1}"]
        }]),
        json!({}),
    );
    assert_eq!(result, json!({"outer": 21}));
}

#[test]
fn domains_concatenate_without_normalization() {
    let result = compose(
        FragmentKind::Domain,
        json!([
            [["state", "=", "open"]],
            "[('user_id', '=', uid)]",
            {"__ref": "domain", "__debug": "['|', ('a', '=', 1), ('b', '=', 2)]"}
        ]),
        json!({"uid": 7}),
    );
    assert_eq!(
        result,
        json!([
            ["state", "=", "open"],
            ["user_id", "=", 7],
            "|", ["a", "=", 1], ["b", "=", 2]
        ])
    );
}

#[test]
fn leading_or_marker_normalizes_every_fragment() {
    let result = compose(
        FragmentKind::Domain,
        json!([
            ["|"],
            [["a", "=", 1], ["b", "=", 2]],
            "[('c', '=', 3)]"
        ]),
        json!({}),
    );
    assert_eq!(
        result,
        json!(["|", "&", ["a", "=", 1], ["b", "=", 2], ["c", "=", 3]])
    );
}

#[test]
fn leading_not_marker_also_normalizes() {
    let result = compose(
        FragmentKind::Domain,
        json!([["!"], [["a", "=", 1], ["b", "=", 2], ["c", "=", 3]]]),
        json!({}),
    );
    assert_eq!(
        result,
        json!(["!", "&", "&", ["a", "=", 1], ["b", "=", 2], ["c", "=", 3]])
    );
}

#[test]
fn balanced_domains_are_left_unchanged() {
    let balanced = vec![
        json!("&"),
        json!(["a", "=", 1]),
        json!("|"),
        json!(["b", "=", 2]),
        json!("!"),
        json!(["c", "=", 3]),
    ];
    assert_eq!(normalize_domain(balanced.clone()), balanced);
    assert_eq!(normalize_domain(Vec::new()), Vec::<Json>::new());
}

#[test]
fn group_bys_accumulate_context() {
    let result = compose(
        FragmentKind::GroupBy,
        json!([
            "{'group_by': 'stage_id', 'seen': 1}",
            "{'group_by': ['user_id'] if seen else []}",
            {"group_by": ""}
        ]),
        json!({}),
    );
    assert_eq!(result, json!(["stage_id", "user_id"]));
}

#[test]
fn domains_and_contexts_together() {
    let source: CompositionSource = serde_json::from_value(json!({
        "contexts": [{"a": 1}, "{'b': a + uid}"],
        "domains": ["[('id', '>', uid)]"],
        "group_by_seq": ["{'group_by': 'name'}"],
        "eval_context": {"uid": 2}
    }))
    .unwrap();
    let composition = evaluate_domains_and_contexts(&source).unwrap();
    assert_eq!(
        serde_json::to_value(&composition).unwrap(),
        json!({
            "context": {"a": 1, "b": 3},
            "domain": [["id", ">", 2]],
            "group_by": ["name"]
        })
    );

    let empty = evaluate_domains_and_contexts(&CompositionSource::default()).unwrap();
    assert!(empty.context.is_empty() && empty.domain.is_empty() && empty.group_by.is_empty());
}

#[test]
fn injected_helpers_are_available() {
    let result = compose(
        FragmentKind::Context,
        json!(["{'year': datetime.date(2024, 5, 17).year, 'today_len': len(current_date)}"]),
        json!({}),
    );
    assert_eq!(result, json!({"year": 2024, "today_len": 10}));
}

#[test]
fn kinds_parse_from_names() {
    assert_eq!("contexts".parse::<FragmentKind>().unwrap(), FragmentKind::Context);
    assert_eq!("domain".parse::<FragmentKind>().unwrap(), FragmentKind::Domain);
    assert_eq!("groupbys".parse::<FragmentKind>().unwrap(), FragmentKind::GroupBy);
    assert!("views".parse::<FragmentKind>().is_err());
}
