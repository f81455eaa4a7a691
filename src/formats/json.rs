//! Render the translations of one language as a nested JSON object.
//!
//! `"This.Is.Resource.Key"` becomes `{"This": {"Is": {"Resource": {"Key": "..."}}}}`.

use crate::resource::LocalizationResource;
use serde_json::{Map, Value};
use tracing::warn;

/// Convert resources to a nested object for `language`.
///
/// # Arguments
/// * `resources` - Resources to render; order decides which of two conflicting keys wins
/// * `language` - Culture to render
/// * `fallback_to_invariant` - Use the invariant translation when `language` has none
/// * `camel_case` - Lower-case the first character of every key segment
pub fn convert(
    resources: &[LocalizationResource],
    language: &str,
    fallback_to_invariant: bool,
    camel_case: bool,
) -> Map<String, Value> {
    let mut root = Map::new();

    for resource in resources {
        // Path-style keys ("/some/path") have no dotted structure to nest by
        if resource.resource_key.contains('/') {
            continue;
        }
        let Some(value) = resource.value_for(language, fallback_to_invariant) else {
            continue;
        };

        let segments: Vec<String> = resource
            .resource_key
            .split('.')
            .map(|segment| {
                if camel_case {
                    to_camel_case(segment)
                } else {
                    segment.to_string()
                }
            })
            .collect();

        if !insert_path(&mut root, &segments, value) {
            warn!(
                "Skipping '{}': key conflicts with another resource",
                resource.resource_key
            );
        }
    }

    root
}

/// Returns `false` when a prefix of `segments` already holds a leaf, or the
/// full path already holds an object.
fn insert_path(root: &mut Map<String, Value>, segments: &[String], value: &str) -> bool {
    let Some((leaf, parents)) = segments.split_last() else {
        return false;
    };

    let mut node = root;
    for segment in parents {
        let child = node
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        match child {
            Value::Object(map) => node = map,
            _ => return false,
        }
    }

    if node.get(leaf).is_some_and(Value::is_object) {
        return false;
    }
    node.insert(leaf.clone(), Value::String(value.to_string()));
    true
}

fn to_camel_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
