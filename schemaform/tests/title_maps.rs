use proptest::prelude::*;
use schemaform::{
    schema::get_input_type,
    title_map::{TitleMapEntry, build_title_map},
};
use serde_json::{Value, json};

fn values(entries: &[TitleMapEntry]) -> Vec<Value> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            TitleMapEntry::Item(item) => Some(item.value.clone()),
            TitleMapEntry::Group { .. } => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn covers_every_enum_value(labels in prop::collection::btree_set("[a-z]{1,8}", 1..8)) {
        let enum_list: Vec<Value> = labels.iter().map(|l| Value::from(l.as_str())).collect();
        let title_map: Vec<Value> = labels
            .iter()
            .map(|l| json!({"name": l.to_uppercase(), "value": l}))
            .collect();
        let out = build_title_map(Some(&Value::Array(title_map)), Some(&enum_list), true, false);
        prop_assert_eq!(out.len(), enum_list.len());
        prop_assert_eq!(values(&out), enum_list);
    }

    #[test]
    fn enum_names_match_array_title_map(labels in prop::collection::btree_set("[a-z]{1,8}", 1..8)) {
        let enum_list: Vec<Value> = labels.iter().map(|l| Value::from(l.as_str())).collect();
        let enum_names = Value::Array(labels.iter().map(|l| Value::from(l.to_uppercase())).collect());
        let title_map = Value::Array(
            labels
                .iter()
                .map(|l| json!({"name": l.to_uppercase(), "value": l}))
                .collect(),
        );
        let from_names = build_title_map(Some(&enum_names), Some(&enum_list), false, false);
        let from_map = build_title_map(Some(&title_map), Some(&enum_list), false, false);
        prop_assert_eq!(from_names, from_map);
    }
}

#[test]
fn group_labels_are_collected() {
    let title_map = json!([
        {"name": "Fruit: Apple", "value": "apple"},
        {"name": "Fruit: Pear", "value": "pear"},
        {"name": "Other", "value": "rock"}
    ]);
    let out = build_title_map(Some(&title_map), None, true, false);
    assert_eq!(
        serde_json::to_value(&out).unwrap(),
        json!([
            {"group": "Fruit", "items": [
                {"name": "Apple", "value": "apple"},
                {"name": "Pear", "value": "pear"}
            ]},
            {"name": "Other", "value": "rock"}
        ])
    );
}

#[test]
fn input_type_is_deterministic() {
    let schemas = [
        json!({"type": "string", "format": "email"}),
        json!({"type": "integer", "minimum": 0, "maximum": 10}),
        json!({"type": "array", "items": {"enum": ["a", "b"]}}),
        json!({"type": "object", "properties": {}}),
        json!({"oneOf": [{"type": "string"}, {"type": "number"}]}),
        json!({"type": "string", "x-schema-form": {"type": "textarea"}}),
    ];
    let expected = ["email", "range", "checkboxes", "section", "one-of", "textarea"];
    for (schema, expected) in schemas.iter().zip(expected) {
        let layout = json!({"inline": false});
        let first = get_input_type(schema, layout.as_object()).unwrap();
        for _ in 0..3 {
            assert_eq!(get_input_type(schema, layout.as_object()).unwrap(), first);
        }
        assert_eq!(first, expected);
    }
}
