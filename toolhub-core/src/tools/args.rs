//! Argument-vector construction from validated input

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("camel boundary regex"));

/// Positional `args` from validated input, without blank entries
pub fn positional_args(input: &Value) -> Vec<String> {
    input
        .get("args")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|entry| !entry.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Map structured fields to long-form flags.
///
/// `true` becomes a bare flag, `false` and `null` are dropped, arrays repeat
/// the flag per element and every other value becomes a flag/value pair.
/// Keys listed in `excluded` are skipped.
pub fn flag_args(input: &Map<String, Value>, excluded: &[&str]) -> Vec<String> {
    let mut args = Vec::new();
    for (key, value) in input {
        if excluded.contains(&key.as_str()) {
            continue;
        }
        let flag = format!("--{}", flag_name(key));
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::Bool(true) => args.push(flag),
            Value::Array(items) => {
                for item in items.iter().filter(|item| !item.is_null()) {
                    args.push(flag.clone());
                    args.push(scalar_text(item));
                }
            }
            other => {
                args.push(flag);
                args.push(scalar_text(other));
            }
        }
    }
    args
}

/// `maxItems` and `max_items` both become `max-items`
pub fn flag_name(key: &str) -> String {
    CAMEL_BOUNDARY
        .replace_all(key, "$1-$2")
        .replace('_', "-")
        .to_lowercase()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_name() {
        assert_eq!(flag_name("outputFormat"), "output-format");
        assert_eq!(flag_name("max_items"), "max-items");
        assert_eq!(flag_name("dryRun2X"), "dry-run2-x");
        assert_eq!(flag_name("URL"), "url");
    }

    #[test]
    fn test_flag_args() {
        let input = json!({
            "args": ["ignored"],
            "dryRun": true,
            "limit": 5,
            "mode": "fast",
            "quiet": false,
            "skip": null,
            "tag": ["a", null, "b"]
        });
        let flags = flag_args(input.as_object().unwrap(), &["args"]);
        assert_eq!(
            flags,
            vec![
                "--dry-run", "--limit", "5", "--mode", "fast", "--tag", "a", "--tag", "b"
            ]
        );
    }

    #[test]
    fn test_positional_args_drop_blanks() {
        let input = json!({"args": ["a", "", "  ", "b c"]});
        assert_eq!(positional_args(&input), vec!["a", "b c"]);
        assert!(positional_args(&json!({})).is_empty());
    }
}
