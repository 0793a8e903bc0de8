//! Feature Frame - single-row table built from a feature record
//!
//! Each request body becomes one frame. Columns are looked up by name;
//! the model decides which ones it needs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;

use super::inference::InferenceError;

/// One cell of the frame
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Text(s) => write!(f, "{}", s),
            FeatureValue::Bool(b) => write!(f, "{}", b),
            FeatureValue::Null => write!(f, "null"),
        }
    }
}

/// Frame construction errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("column '{0}' holds a nested {1}; only scalar values are supported")]
    NestedValue(String, &'static str),
}

/// Single-row tabular input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    columns: BTreeMap<String, FeatureValue>,
}

impl FeatureFrame {
    /// Wrap a JSON object as a single-row frame
    pub fn from_json(value: &Value) -> Result<Self, FrameError> {
        let object = value
            .as_object()
            .ok_or_else(|| FrameError::NotAnObject(json_kind(value)))?;

        let mut columns = BTreeMap::new();
        for (name, cell) in object {
            let cell = match cell {
                Value::Null => FeatureValue::Null,
                Value::Bool(b) => FeatureValue::Bool(*b),
                Value::Number(n) => FeatureValue::Number(n.as_f64().unwrap_or(f64::NAN)),
                Value::String(s) => FeatureValue::Text(s.clone()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(FrameError::NestedValue(name.clone(), json_kind(cell)));
                }
            };
            columns.insert(name.clone(), cell);
        }

        Ok(Self { columns })
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns.get(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Fetch every required column or report all the missing ones at once
    pub fn require<'a, I>(&self, names: I) -> Result<Vec<&FeatureValue>, InferenceError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found = Vec::new();
        let mut missing = BTreeSet::new();

        for name in names {
            match self.get(name) {
                Some(value) => found.push(value),
                None => {
                    missing.insert(name.to_string());
                }
            }
        }

        if missing.is_empty() {
            Ok(found)
        } else {
            Err(InferenceError::MissingColumns(missing.into_iter().collect()))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
impl FeatureFrame {
    pub fn with(mut self, name: &str, value: FeatureValue) -> Self {
        self.columns.insert(name.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        let frame = FeatureFrame::from_json(&json!({
            "brand": "Patagonia",
            "weight_kg": 1.5,
            "refurbished": false,
            "notes": null,
        }))
        .unwrap();

        assert_eq!(frame.len(), 4);
        assert_eq!(frame.get("brand"), Some(&FeatureValue::Text("Patagonia".into())));
        assert_eq!(frame.get("weight_kg"), Some(&FeatureValue::Number(1.5)));
        assert_eq!(frame.get("refurbished"), Some(&FeatureValue::Bool(false)));
        assert_eq!(frame.get("notes"), Some(&FeatureValue::Null));
    }

    #[test]
    fn test_empty_object_is_a_valid_frame() {
        let frame = FeatureFrame::from_json(&json!({})).unwrap();
        assert_eq!(frame.len(), 0);
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(
            FeatureFrame::from_json(&json!([1, 2])),
            Err(FrameError::NotAnObject("array"))
        );
        assert_eq!(
            FeatureFrame::from_json(&json!("brand")),
            Err(FrameError::NotAnObject("string"))
        );
    }

    #[test]
    fn test_nested_value_rejected() {
        let err = FeatureFrame::from_json(&json!({"brand": {"name": "x"}})).unwrap_err();
        assert_eq!(err, FrameError::NestedValue("brand".into(), "object"));
        assert!(err.to_string().contains("'brand'"));
    }

    #[test]
    fn test_require_reports_all_missing_columns() {
        let frame = FeatureFrame::default().with("color", FeatureValue::Text("red".into()));

        match frame.require(["category", "brand", "color"]) {
            Err(InferenceError::MissingColumns(names)) => {
                assert_eq!(names, vec!["brand".to_string(), "category".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_require_returns_values_in_request_order() {
        let frame = FeatureFrame::default()
            .with("brand", FeatureValue::Text("Zara".into()))
            .with("category", FeatureValue::Text("Clothing".into()));

        let values = frame.require(["category", "brand"]).unwrap();
        assert_eq!(values[0], &FeatureValue::Text("Clothing".into()));
        assert_eq!(values[1], &FeatureValue::Text("Zara".into()));
    }
}
