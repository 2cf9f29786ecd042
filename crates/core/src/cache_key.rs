//! Stable cache keys for completed results.

use serde_json::Value;

/// Derive the result-cache key for `(tool_id, params)`.
///
/// `serde_json::Value` objects iterate in key order, so two parameter
/// maps with the same contents serialize identically regardless of how
/// the caller assembled them. The key therefore satisfies "a cache key
/// always maps to the same completed result".
pub fn cache_key(tool_id: &str, params: &Value) -> String {
    let serialized =
        serde_json::to_string(params).expect("serde_json::Value is always serialisable");
    format!("{tool_id}:{serialized}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_params_share_a_key() {
        let a = json!({ "prompt": "a red balloon", "style": "photo" });
        let b = json!({ "style": "photo", "prompt": "a red balloon" });
        assert_eq!(cache_key("text-to-image", &a), cache_key("text-to-image", &b));
    }

    #[test]
    fn different_params_differ() {
        let a = json!({ "prompt": "a red balloon" });
        let b = json!({ "prompt": "a blue balloon" });
        assert_ne!(cache_key("text-to-image", &a), cache_key("text-to-image", &b));
    }

    #[test]
    fn tool_id_is_part_of_the_key() {
        let params = json!({ "prompt": "a red balloon" });
        assert_ne!(
            cache_key("text-to-image", &params),
            cache_key("text-to-video", &params)
        );
    }

    #[test]
    fn nested_objects_are_stable_too() {
        let a = json!({ "knobs": { "strength": 0.5, "seed": 7 } });
        let b = json!({ "knobs": { "seed": 7, "strength": 0.5 } });
        assert_eq!(cache_key("t", &a), cache_key("t", &b));
    }
}
