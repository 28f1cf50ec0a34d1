//! Document and field value types for the Firestore REST wire format.
//!
//! Firestore encodes every field as a single-key object naming its type,
//! e.g. `{"stringValue": "alice"}` or `{"integerValue": "42"}` (int64 values
//! travel as decimal strings). Documents carry their full resource name plus
//! server-assigned create/update times.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed Firestore field value.
///
/// The externally tagged representation matches the REST encoding exactly,
/// so unknown record fields survive a read-modify-write untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// Int64, encoded as a decimal string on the wire.
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339 timestamp string.
    TimestampValue(String),
    StringValue(String),
    /// Base64-encoded bytes.
    BytesValue(String),
    /// Full resource name of another document.
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

/// Geographic point value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Wrapper for array values (`{"arrayValue": {"values": [...]}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

/// Wrapper for map values (`{"mapValue": {"fields": {...}}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    /// Convenience constructor for the most common field type.
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringValue(value.into())
    }
}

/// String coercion used by the directory search: scalars render as their
/// canonical text form, arrays join their elements, maps join `key=value`
/// pairs.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullValue(()) => f.write_str("null"),
            Self::BooleanValue(b) => write!(f, "{b}"),
            Self::IntegerValue(s)
            | Self::TimestampValue(s)
            | Self::StringValue(s)
            | Self::BytesValue(s)
            | Self::ReferenceValue(s) => f.write_str(s),
            Self::DoubleValue(d) => write!(f, "{d}"),
            Self::GeoPointValue(p) => write!(f, "{},{}", p.latitude, p.longitude),
            Self::ArrayValue(array) => {
                for (i, value) in array.values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
            Self::MapValue(map) => {
                for (i, (key, value)) in map.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                Ok(())
            }
        }
    }
}

/// A field value destined for a document write.
///
/// `ServerTimestamp` is the sentinel resolved by Firestore at commit time;
/// it never appears in read responses.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    Set(Value),
    ServerTimestamp,
}

/// One Firestore document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name:
    /// `projects/{project}/databases/{database}/documents/{collection}/{id}`.
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// The opaque identifier: the last segment of the resource name.
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// String form of a field, empty if absent. Non-string values coerce the
    /// same way the directory search does.
    #[must_use]
    pub fn field_text(&self, key: &str) -> String {
        self.fields
            .get(key)
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_value_wire_shape() {
        let value = Value::string("alice");
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"stringValue": "alice"})
        );
    }

    #[test]
    fn test_null_value_wire_shape() {
        let value = Value::NullValue(());
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"nullValue": null})
        );
        let back: Value = serde_json::from_value(json!({"nullValue": null})).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_integer_value_is_string_encoded() {
        let value: Value = serde_json::from_value(json!({"integerValue": "42"})).unwrap();
        assert_eq!(value, Value::IntegerValue("42".to_string()));
        assert_eq!(value.to_string(), "42");
    }

    #[test]
    fn test_document_deserializes_from_list_response_shape() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/demo/databases/(default)/documents/users/abc123",
            "fields": {
                "username": {"stringValue": "alice"},
                "email": {"stringValue": "a@x.com"},
                "logins": {"integerValue": "7"},
                "profile": {"mapValue": {"fields": {"city": {"stringValue": "Oslo"}}}}
            },
            "createTime": "2024-01-02T03:04:05.678Z",
            "updateTime": "2024-01-02T03:04:05.678Z"
        }))
        .unwrap();

        assert_eq!(document.id(), "abc123");
        assert_eq!(document.field_text("username"), "alice");
        assert_eq!(document.field_text("logins"), "7");
        assert_eq!(document.field_text("profile"), "city=Oslo");
        assert_eq!(document.field_text("missing"), "");
    }

    #[test]
    fn test_document_with_no_fields() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/demo/databases/(default)/documents/users/empty"
        }))
        .unwrap();
        assert!(document.fields.is_empty());
        assert_eq!(document.id(), "empty");
    }

    #[test]
    fn test_array_value_display_joins_elements() {
        let value = Value::ArrayValue(ArrayValue {
            values: vec![
                Value::string("a"),
                Value::IntegerValue("2".to_string()),
                Value::BooleanValue(true),
            ],
        });
        assert_eq!(value.to_string(), "a,2,true");
    }
}
