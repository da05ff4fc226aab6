//! Typed response models for the Sheets values API.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub range: Option<String>,
    pub major_dimension: Option<String>,
    /// Absent entirely when the requested range is empty.
    pub values: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    pub spreadsheet_id: Option<String>,
    pub updated_range: Option<String>,
    pub updated_rows: Option<u32>,
    pub updated_columns: Option<u32>,
    pub updated_cells: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearValuesResponse {
    pub spreadsheet_id: Option<String>,
    pub cleared_range: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_range_without_values_field() {
        let body = r#"{"range":"'Реєстр'!A7:O","majorDimension":"ROWS"}"#;
        let vr: ValueRange = serde_json::from_str(body).unwrap();
        assert!(vr.values.is_none());
    }

    #[test]
    fn value_range_with_mixed_scalars() {
        let body = r#"{"values":[["01.06.2026","ТОВ Тест",500.0,true]]}"#;
        let vr: ValueRange = serde_json::from_str(body).unwrap();
        let rows = vr.values.unwrap();
        assert_eq!(rows[0].len(), 4);
        assert_eq!(rows[0][2], serde_json::json!(500.0));
    }
}
