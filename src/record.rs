use serde_json::{Map, Value};

/// Device identity carried by a [`DeviceApps`] record.
///
/// Both fields are independently optional. `kind` surfaces as the `"type"`
/// key at the host boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Device {
    pub id: Option<String>,
    pub kind: Option<String>,
}

impl Device {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.kind.is_none()
    }
}

/// One device/apps record.
///
/// The `device` sub-message is structurally always present; its fields are
/// individually optional. Absence of `lat`/`lon` is distinct from zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceApps {
    pub device: Device,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Installed application ids, in input order. Duplicates permitted.
    pub apps: Vec<u32>,
}

/// A host record does not match the expected shape or types.
///
/// Validation is fail-fast: the first violation aborts construction of the
/// record, and the enclosing write operation aborts with it.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("expected a map for the record, got {0}")]
    NotAMap(&'static str),

    #[error("expected a map for key \"device\", got {0}")]
    DeviceNotAMap(&'static str),

    #[error("expected a string for key \"device.{key}\", got {got}")]
    DeviceFieldType {
        key: &'static str,
        got: &'static str,
    },

    #[error("expected a number for key \"{key}\", got {got}")]
    CoordType {
        key: &'static str,
        got: &'static str,
    },

    #[error("expected an array for key \"apps\", got {0}")]
    AppsNotAnArray(&'static str),

    #[error("app id at index {0} is not an unsigned 32-bit integer")]
    AppType(usize),
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_device(map: &Map<String, Value>) -> Result<Device, SchemaError> {
    let mut device = Device::default();
    for (key, value) in map {
        match key.as_str() {
            "id" => {
                let id = value.as_str().ok_or(SchemaError::DeviceFieldType {
                    key: "id",
                    got: json_kind(value),
                })?;
                device.id = Some(id.to_string());
            }
            "type" => {
                let kind = value.as_str().ok_or(SchemaError::DeviceFieldType {
                    key: "type",
                    got: json_kind(value),
                })?;
                device.kind = Some(kind.to_string());
            }
            _ => {}
        }
    }
    Ok(device)
}

fn parse_coord(key: &'static str, value: &Value) -> Result<f64, SchemaError> {
    value.as_f64().ok_or(SchemaError::CoordType {
        key,
        got: json_kind(value),
    })
}

fn parse_apps(value: &Value) -> Result<Vec<u32>, SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| SchemaError::AppsNotAnArray(json_kind(value)))?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_u64()
                .and_then(|id| u32::try_from(id).ok())
                .ok_or(SchemaError::AppType(index))
        })
        .collect()
}

impl DeviceApps {
    /// Build a record from a loosely typed host value.
    ///
    /// Recognized keys: `device` (map with string `id`/`type`), `lat` and
    /// `lon` (numbers, integer or floating-point), `apps` (array of u32).
    /// Unrecognized keys are ignored; an absent `apps` key yields an empty
    /// sequence.
    pub fn from_value(value: &Value) -> Result<DeviceApps, SchemaError> {
        let map = value
            .as_object()
            .ok_or_else(|| SchemaError::NotAMap(json_kind(value)))?;

        let mut record = DeviceApps::default();
        for (key, value) in map {
            match key.as_str() {
                "device" => {
                    let device = value
                        .as_object()
                        .ok_or_else(|| SchemaError::DeviceNotAMap(json_kind(value)))?;
                    record.device = parse_device(device)?;
                }
                "lat" => record.lat = Some(parse_coord("lat", value)?),
                "lon" => record.lon = Some(parse_coord("lon", value)?),
                "apps" => record.apps = parse_apps(value)?,
                _ => {}
            }
        }
        Ok(record)
    }

    /// Project the record back to the host shape.
    ///
    /// `device` and `apps` are always present (possibly empty); `lat`, `lon`
    /// and the device sub-fields appear only when set.
    pub fn to_value(&self) -> Value {
        let mut device = Map::new();
        if let Some(id) = &self.device.id {
            device.insert("id".to_string(), Value::String(id.clone()));
        }
        if let Some(kind) = &self.device.kind {
            device.insert("type".to_string(), Value::String(kind.clone()));
        }

        let mut map = Map::new();
        map.insert("device".to_string(), Value::Object(device));
        if let Some(lat) = self.lat {
            map.insert("lat".to_string(), Value::from(lat));
        }
        if let Some(lon) = self.lon {
            map.insert("lon".to_string(), Value::from(lon));
        }
        map.insert(
            "apps".to_string(),
            Value::Array(self.apps.iter().map(|&id| Value::from(id)).collect()),
        );
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_full() {
        let record = DeviceApps::from_value(&json!({
            "device": {"id": "a1", "type": "idfa"},
            "lat": 67.7,
            "lon": -17.0,
            "apps": [1, 2, 3, 42],
        }))
        .unwrap();

        assert_eq!(record.device.id.as_deref(), Some("a1"));
        assert_eq!(record.device.kind.as_deref(), Some("idfa"));
        assert_eq!(record.lat, Some(67.7));
        assert_eq!(record.lon, Some(-17.0));
        assert_eq!(record.apps, vec![1, 2, 3, 42]);
    }

    #[test]
    fn test_from_value_missing_keys_are_absent() {
        let record = DeviceApps::from_value(&json!({"apps": [1]})).unwrap();
        assert!(record.device.is_empty());
        assert_eq!(record.lat, None);
        assert_eq!(record.lon, None);
        assert_eq!(record.apps, vec![1]);
    }

    #[test]
    fn test_from_value_absent_apps_yields_empty() {
        let record = DeviceApps::from_value(&json!({"lat": 1})).unwrap();
        assert!(record.apps.is_empty());
        assert_eq!(record.lat, Some(1.0));
    }

    #[test]
    fn test_from_value_integer_coords_accepted() {
        let record = DeviceApps::from_value(&json!({"lat": 67, "lon": -17})).unwrap();
        assert_eq!(record.lat, Some(67.0));
        assert_eq!(record.lon, Some(-17.0));
    }

    #[test]
    fn test_from_value_unknown_keys_ignored() {
        let record = DeviceApps::from_value(&json!({
            "device": {"id": "a1", "mac": "00:11"},
            "extra": true,
            "apps": [],
        }))
        .unwrap();
        assert_eq!(record.device.id.as_deref(), Some("a1"));
        assert!(record.device.kind.is_none());
    }

    #[test]
    fn test_from_value_not_a_map() {
        assert!(matches!(
            DeviceApps::from_value(&json!([1, 2])),
            Err(SchemaError::NotAMap("array"))
        ));
    }

    #[test]
    fn test_from_value_device_must_be_map() {
        assert!(matches!(
            DeviceApps::from_value(&json!({"device": "a1"})),
            Err(SchemaError::DeviceNotAMap("string"))
        ));
    }

    #[test]
    fn test_from_value_device_id_must_be_string() {
        assert!(matches!(
            DeviceApps::from_value(&json!({"device": {"id": 3}})),
            Err(SchemaError::DeviceFieldType { key: "id", .. })
        ));
    }

    #[test]
    fn test_from_value_coord_must_be_number() {
        assert!(matches!(
            DeviceApps::from_value(&json!({"lon": "east"})),
            Err(SchemaError::CoordType { key: "lon", .. })
        ));
    }

    #[test]
    fn test_from_value_apps_must_be_array() {
        assert!(matches!(
            DeviceApps::from_value(&json!({"apps": 1})),
            Err(SchemaError::AppsNotAnArray("number"))
        ));
    }

    #[test]
    fn test_from_value_app_ids_must_be_u32() {
        assert!(matches!(
            DeviceApps::from_value(&json!({"apps": [1, -2]})),
            Err(SchemaError::AppType(1))
        ));
        assert!(matches!(
            DeviceApps::from_value(&json!({"apps": [4294967296u64]})),
            Err(SchemaError::AppType(0))
        ));
        assert!(matches!(
            DeviceApps::from_value(&json!({"apps": [1.5]})),
            Err(SchemaError::AppType(0))
        ));
    }

    #[test]
    fn test_to_value_projection() {
        let record = DeviceApps {
            device: Device {
                id: Some("a1".to_string()),
                kind: None,
            },
            lat: Some(67.7),
            lon: None,
            apps: vec![7],
        };

        assert_eq!(
            record.to_value(),
            json!({"device": {"id": "a1"}, "lat": 67.7, "apps": [7]})
        );
    }

    #[test]
    fn test_to_value_empty_record() {
        assert_eq!(
            DeviceApps::default().to_value(),
            json!({"device": {}, "apps": []})
        );
    }
}
