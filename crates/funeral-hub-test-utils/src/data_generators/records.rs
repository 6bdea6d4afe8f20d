use chrono::NaiveDate;
use funeral_hub_core::Deceased;
use serde_json::{json, Map, Value};

pub fn deceased(full_name: &str) -> Deceased {
    Deceased {
        full_name: full_name.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1948, 5, 17).unwrap_or_default(),
        mother_name: Some("Maria Aparecida".to_string()),
        cpf: Some("123.456.789-09".to_string()),
    }
}

/// Burial progress fields, as a caller would post them
pub fn burial_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("burial fields must be a JSON object, got {}", other),
    }
}

/// Fields marking the burial as performed
pub fn burial_performed() -> Map<String, Value> {
    burial_fields(json!({
        "body_removed": true,
        "burial_stage": "performed",
    }))
}
