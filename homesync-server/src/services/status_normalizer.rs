//! Turns raw cloud status lists into [`DeviceSnapshot`]s.
//!
//! Accepted input is a JSON array of `{ "code": string, "value": bool | number | string }`.
//! Repeated codes collapse to the last value while keeping the first position.

use homesync_api::provider::StatusPair;
use serde_json::Value;

use crate::errors::PayloadError;
use crate::models::{DeviceSnapshot, StatusValue};

pub fn normalize(raw: &Value) -> Result<DeviceSnapshot, PayloadError> {
    let items = raw
        .as_array()
        .ok_or_else(|| PayloadError::MalformedPayload("status must be a list".to_string()))?;

    let mut snapshot = DeviceSnapshot::new();

    for (index, item) in items.iter().enumerate() {
        let object = item.as_object().ok_or_else(|| {
            PayloadError::MalformedPayload(format!("status[{index}] must be an object"))
        })?;

        let code = object
            .get("code")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                PayloadError::MalformedPayload(format!("status[{index}] has no code"))
            })?;

        let value = object.get("value").ok_or_else(|| {
            PayloadError::MalformedPayload(format!("status[{index}] has no value"))
        })?;

        snapshot.insert(code, scalar(code, value)?);
    }

    Ok(snapshot)
}

/// Same as [`normalize`] for pairs already split by the provider client.
pub fn normalize_pairs(pairs: &[StatusPair]) -> Result<DeviceSnapshot, PayloadError> {
    let mut snapshot = DeviceSnapshot::new();

    for pair in pairs {
        if pair.code.is_empty() {
            return Err(PayloadError::MalformedPayload("status entry has no code".to_string()));
        }
        snapshot.insert(pair.code.as_str(), scalar(&pair.code, &pair.value)?);
    }

    Ok(snapshot)
}

fn scalar(code: &str, value: &Value) -> Result<StatusValue, PayloadError> {
    StatusValue::from_json(value).ok_or_else(|| {
        PayloadError::MalformedPayload(format!("value of {code} must be a boolean, number or string"))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_normalize_mixed_value_types() {
        let snapshot = normalize(&json!([
            { "code": "switch_led", "value": true },
            { "code": "bright_value", "value": 255 },
            { "code": "work_mode", "value": "colour" }
        ]))
        .unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get("switch_led"), Some(&StatusValue::Bool(true)));
        assert_eq!(snapshot.get("bright_value").unwrap().to_string(), "255");
        assert_eq!(snapshot.get("work_mode"), Some(&StatusValue::Text("colour".into())));
    }

    #[test]
    fn test_repeated_code_is_last_write_wins() {
        let snapshot = normalize(&json!([
            { "code": "switch", "value": false },
            { "code": "countdown", "value": 0 },
            { "code": "switch", "value": true }
        ]))
        .unwrap();

        let codes: Vec<&str> = snapshot.iter().map(|(code, _)| code.as_str()).collect();
        assert_eq!(codes, vec!["switch", "countdown"]);
        assert_eq!(snapshot.get("switch"), Some(&StatusValue::Bool(true)));
    }

    #[test]
    fn test_empty_list_is_an_empty_snapshot() {
        assert!(normalize(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_malformed_shapes() {
        let cases = [
            json!({ "code": "switch", "value": true }),
            json!(null),
            json!(["switch"]),
            json!([{ "value": true }]),
            json!([{ "code": "", "value": true }]),
            json!([{ "code": "switch" }]),
            json!([{ "code": "switch", "value": null }]),
            json!([{ "code": "colour_data", "value": { "h": 1 } }]),
        ];

        for case in cases {
            assert!(
                matches!(normalize(&case), Err(PayloadError::MalformedPayload(_))),
                "accepted {case}"
            );
        }
    }

    #[test]
    fn test_normalize_pairs_rejects_nested_values() {
        let pairs = vec![StatusPair { code: "switch".into(), value: json!([1, 2]) }];

        assert!(normalize_pairs(&pairs).is_err());
    }
}
