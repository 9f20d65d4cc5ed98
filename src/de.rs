//! Field deserializers for hand-maintained JSON, where an explicit `null`
//! or a value of the wrong type must not reject the surrounding document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Treat an explicit `null` like a missing field
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fall back to the default on `null` or on a value of the wrong type
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A list whose malformed entries are dropped one by one. Anything that is
/// not a list reads as empty.
pub(crate) fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping malformed list entry: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "null_default")]
        flag: bool,
        #[serde(default, deserialize_with = "lenient")]
        score: Option<f64>,
        #[serde(default, deserialize_with = "lenient_items")]
        tags: Vec<String>,
    }

    #[test]
    fn test_null_and_wrong_types() {
        let row: Row = serde_json::from_value(json!({
            "flag": null,
            "score": "0.3",
            "tags": ["a", 7, "b", null]
        }))
        .unwrap();
        assert!(!row.flag);
        assert_eq!(row.score, None);
        assert_eq!(row.tags, vec!["a".to_string(), "b".to_string()]);

        let row: Row = serde_json::from_value(json!({ "score": 1.5, "tags": null })).unwrap();
        assert_eq!(row.score, Some(1.5));
        assert!(row.tags.is_empty());
    }

    #[test]
    fn test_null_default_keeps_type_errors() {
        assert!(serde_json::from_value::<Row>(json!({ "flag": "yes" })).is_err());
    }
}
