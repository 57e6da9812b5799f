use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hashes `spec` deterministically: object keys are sorted recursively before
/// hashing, so field ordering in the source type never changes the digest
/// (SPEC_FULL §8 "hash determinism").
///
/// A marshal error is treated by callers as "spec changed" (§4.2 step 4) rather
/// than a fatal error, so this returns the `serde_json::Error` untouched.
pub fn hash_spec<T: Serialize>(spec: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(spec)?;
    Ok(hash_value(&value))
}

/// Hashes an already-decoded JSON value, e.g. the `spec` sub-tree of an
/// unstructured/dynamic child object (SPEC_FULL §4.3 drift detection).
pub fn hash_value(value: &Value) -> String {
    let canonical = canonicalize(value);
    let bytes = serde_json::to_vec(&canonical).expect("canonicalized value always serializes");
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}

/// Recursively sorts object keys so that two structurally-equal values always
/// serialize to the same bytes regardless of the original field order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in entries {
                out.insert(k.clone(), canonicalize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_spec_hashes_equal() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn different_spec_hashes_differ() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn nested_key_order_is_irrelevant() {
        let a = json!({"outer": {"x": 1, "y": 2}, "z": [1, 2, 3]});
        let b = json!({"z": [1, 2, 3], "outer": {"y": 2, "x": 1}});
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn hash_spec_is_deterministic_across_calls() {
        #[derive(Serialize)]
        struct S {
            replicas: i32,
            name: String,
        }
        let s = S { replicas: 3, name: "llama3".into() };
        assert_eq!(hash_spec(&s).unwrap(), hash_spec(&s).unwrap());
    }
}
