//! Priority merging of JSON documents.
//!
//! `higher` always wins for scalars. Objects merge key by key, lists are
//! unioned, and tag lists (`[{"key": .., "value": ..}]`) merge by `key`.

use serde_json::{Map, Value};

const TAG_LIST_KEYS: [&str; 2] = ["tags", "additional_tags"];

/// Merge `higher` over `lower`, returning a new map.
pub fn merge_maps(lower: &Map<String, Value>, higher: &Map<String, Value>) -> Map<String, Value> {
    let mut result = lower.clone();
    for (key, higher_value) in higher {
        let merged = match result.get(key) {
            Some(lower_value) => merge_values(key, lower_value, higher_value),
            None => higher_value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

fn merge_values(key: &str, lower: &Value, higher: &Value) -> Value {
    match (lower, higher) {
        (_, Value::Null) => lower.clone(),
        (Value::Null, _) => higher.clone(),
        (Value::Array(lower), Value::Array(higher)) => Value::Array(merge_lists(key, lower, higher)),
        (Value::Object(lower), Value::Object(higher)) => Value::Object(merge_maps(lower, higher)),
        _ => {
            log::debug!("'{key}': {higher} overrides {lower}");
            higher.clone()
        }
    }
}

fn merge_lists(key: &str, lower: &[Value], higher: &[Value]) -> Vec<Value> {
    if TAG_LIST_KEYS.contains(&key) && is_tag_list(higher) {
        return merge_tag_lists(lower, higher);
    }

    let mut result = higher.to_vec();
    for item in lower {
        if !result.contains(item) {
            result.push(item.clone());
        }
    }
    result
}

fn merge_tag_lists(lower: &[Value], higher: &[Value]) -> Vec<Value> {
    let higher_keys: Vec<&Value> = higher.iter().filter_map(|tag| tag.get("key")).collect();

    let mut result = higher.to_vec();
    for tag in lower {
        match tag.get("key") {
            Some(k) if higher_keys.contains(&k) => {
                log::debug!("tag {k} overridden by higher priority");
            }
            _ => result.push(tag.clone()),
        }
    }
    result
}

fn is_tag_list(items: &[Value]) -> bool {
    !items.is_empty()
        && items
            .iter()
            .all(|item| item.as_object().is_some_and(|o| o.contains_key("key")))
}

/// Top-level keys added (`+key`) or changed (`~key`) between two maps.
pub fn detect_changes(before: &Map<String, Value>, after: &Map<String, Value>) -> Vec<String> {
    after
        .iter()
        .filter_map(|(key, value)| match before.get(key) {
            None => Some(format!("+{key}")),
            Some(old) if old != value => Some(format!("~{key}")),
            Some(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_scalar_higher_wins() {
        let merged = merge_maps(
            &obj(json!({"region": "us-east-1", "size": 1})),
            &obj(json!({"region": "eu-west-1"})),
        );
        assert_eq!(Value::Object(merged), json!({"region": "eu-west-1", "size": 1}));
    }

    #[test]
    fn test_null_never_overwrites() {
        let merged = merge_maps(
            &obj(json!({"region": "us-east-1"})),
            &obj(json!({"region": null, "zone": null})),
        );
        assert_eq!(Value::Object(merged), json!({"region": "us-east-1", "zone": null}));
    }

    #[test]
    fn test_nested_objects_merge_recursively() {
        let merged = merge_maps(
            &obj(json!({"encryption": {"enabled": false, "kms": "default"}})),
            &obj(json!({"encryption": {"enabled": true}})),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"encryption": {"enabled": true, "kms": "default"}})
        );
    }

    #[test]
    fn test_lists_union_higher_first() {
        let merged = merge_maps(
            &obj(json!({"ports": [80, 443]})),
            &obj(json!({"ports": [8080, 80]})),
        );
        assert_eq!(Value::Object(merged), json!({"ports": [8080, 80, 443]}));
    }

    #[test]
    fn test_tag_lists_merge_by_key() {
        let merged = merge_maps(
            &obj(json!({"tags": [
                {"key": "team", "value": "infra"},
                {"key": "cost", "value": "shared"}
            ]})),
            &obj(json!({"tags": [{"key": "team", "value": "payments"}]})),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"tags": [
                {"key": "team", "value": "payments"},
                {"key": "cost", "value": "shared"}
            ]})
        );
    }

    #[test]
    fn test_detect_changes() {
        let before = obj(json!({"a": 1, "b": 2}));
        let after = obj(json!({"a": 1, "b": 3, "c": 4}));
        assert_eq!(detect_changes(&before, &after), vec!["~b", "+c"]);
    }
}
