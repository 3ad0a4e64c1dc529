//! JSON Schema validation for exported rows.
//!
//! The schema is generated from the table's columns (JSON Schema Draft 7):
//!
//! - `food_id` - integer
//! - `food_name` - string
//! - every measurement column - a number or the string `"N/A"`
//!
//! No other field is allowed and every column is required.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use nutritab::validation::{row_schema, validate};
//!
//! let schema = row_schema(&["Calories (per 100g)".to_string()]);
//! let row = json!({ "food_id": 1, "food_name": "Apple, raw", "Calories (per 100g)": 52.0 });
//! assert!(validate(&schema, &row).is_ok());
//! ```

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::models::{Basis, FOOD_ID_COLUMN, FOOD_NAME_COLUMN, NOT_AVAILABLE};

/// Validation errors kept per report.
const MAX_REPORTED: usize = 10;

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Simpler version: just true/false.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Schema of one exported row.
pub fn row_schema(measure_columns: &[String]) -> Value {
    let mut properties = Map::new();
    properties.insert(FOOD_ID_COLUMN.to_string(), json!({ "type": "integer" }));
    properties.insert(FOOD_NAME_COLUMN.to_string(), json!({ "type": "string" }));
    for column in measure_columns {
        properties.insert(column.clone(), json!({ "$ref": "#/definitions/measure" }));
    }

    let required: Vec<&str> = [FOOD_ID_COLUMN, FOOD_NAME_COLUMN]
        .into_iter()
        .chain(measure_columns.iter().map(String::as_str))
        .collect();

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Food nutrient row",
        "type": "object",
        "required": required,
        "properties": properties,
        "additionalProperties": false,
        "definitions": {
            "measure": {
                "anyOf": [
                    { "type": "number" },
                    { "const": NOT_AVAILABLE }
                ]
            }
        }
    })
}

/// Outcome of validating many rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub rows: usize,
    pub valid: usize,
    pub invalid: usize,
    /// First failing rows (row index, errors)
    pub errors: Vec<(usize, Vec<String>)>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.invalid == 0
    }
}

/// Validate rows against the schema for `measure_columns`.
pub fn validate_records(
    records: &[Value],
    measure_columns: &[String],
) -> Result<ValidationReport, Vec<String>> {
    let schema = row_schema(measure_columns);
    let validator = jsonschema::draft7::new(&schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let mut report = ValidationReport {
        rows: records.len(),
        ..ValidationReport::default()
    };

    for (i, record) in records.iter().enumerate() {
        let errors: Vec<String> = validator.iter_errors(record).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            report.valid += 1;
        } else {
            report.invalid += 1;
            if report.errors.len() < MAX_REPORTED {
                report.errors.push((i, errors));
            }
        }
    }

    Ok(report)
}

/// Measurement columns declared by an exported file, taken from its first row.
///
/// Every label must carry all three bases.
pub fn infer_measure_columns(records: &[Value]) -> Result<Vec<String>, Vec<String>> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let object = first
        .as_object()
        .ok_or_else(|| vec!["Row 0 is not a JSON object".to_string()])?;

    let mut errors = Vec::new();
    let mut bases: BTreeMap<&str, Vec<Basis>> = BTreeMap::new();
    let mut columns = Vec::new();

    for key in object.keys() {
        if key == FOOD_ID_COLUMN || key == FOOD_NAME_COLUMN {
            continue;
        }
        match Basis::parse_column(key) {
            Some((label, basis)) => {
                bases.entry(label).or_default().push(basis);
                columns.push(key.clone());
            }
            None => errors.push(format!("Unexpected column '{}'", key)),
        }
    }

    for (label, found) in &bases {
        for basis in Basis::ALL {
            if !found.contains(&basis) {
                errors.push(format!("Missing column '{}'", basis.column_name(label)));
            }
        }
    }

    if errors.is_empty() {
        Ok(columns)
    } else {
        Err(errors)
    }
}

/// Validate a whole exported document (a JSON array of rows).
pub fn validate_export(document: &Value) -> Result<ValidationReport, Vec<String>> {
    let records = document
        .as_array()
        .ok_or_else(|| vec!["Export must be a JSON array of rows".to_string()])?;
    let columns = infer_measure_columns(records)?;
    validate_records(records, &columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec![
            "Calories (per 100g)".into(),
            "Calories (per gram)".into(),
            "Calories (per ounce)".into(),
        ]
    }

    fn apple() -> Value {
        json!({
            "food_id": 1,
            "food_name": "Apple, raw",
            "Calories (per 100g)": 52.0,
            "Calories (per gram)": 0.52,
            "Calories (per ounce)": 14.7417
        })
    }

    #[test]
    fn test_valid_row() {
        assert!(validate(&row_schema(&columns()), &apple()).is_ok());
    }

    #[test]
    fn test_not_available_allowed() {
        let mut row = apple();
        row["Calories (per gram)"] = json!("N/A");
        assert!(is_valid(&row_schema(&columns()), &row));
    }

    #[test]
    fn test_other_strings_rejected() {
        let mut row = apple();
        row["Calories (per gram)"] = json!("0");
        assert!(!is_valid(&row_schema(&columns()), &row));
    }

    #[test]
    fn test_missing_and_extra_fields() {
        let schema = row_schema(&columns());

        let mut row = apple();
        row.as_object_mut().unwrap().remove("Calories (per ounce)");
        assert!(validate(&schema, &row).is_err());

        let mut row = apple();
        row["fdc_id"] = json!(1);
        assert!(validate(&schema, &row).is_err());

        let mut row = apple();
        row["food_id"] = json!("1");
        assert!(validate(&schema, &row).is_err());
    }

    #[test]
    fn test_validate_export_report() {
        let mut bad = apple();
        bad["Calories (per 100g)"] = json!(null);
        let document = json!([apple(), bad]);

        let report = validate_export(&document).unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.valid, 1);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.errors[0].0, 1);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_infer_incomplete_triple() {
        let mut row = apple();
        row.as_object_mut().unwrap().remove("Calories (per gram)");

        let errors = infer_measure_columns(&[row]).unwrap_err();
        assert_eq!(errors, vec!["Missing column 'Calories (per gram)'"]);
    }

    #[test]
    fn test_not_an_array() {
        assert!(validate_export(&apple()).is_err());
        assert_eq!(validate_export(&json!([])).unwrap().rows, 0);
    }
}
