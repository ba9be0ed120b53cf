//! Field edits over serialized forms
//!
//! Provides [`FieldEdit`] and [`apply_edits`], the functional update used to
//! resolve a form to one coordinate: the input document is never modified,
//! a new document with every edited field replaced is returned.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::path::LocationPath;
use crate::value::ParamValue;

/// Replace the field at `location` with `value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEdit {
    /// Location from the form root
    #[serde(rename = "location_list")]
    pub location: LocationPath,
    /// Resolved value
    pub value: ParamValue,
}

impl FieldEdit {
    /// Create new edit
    #[inline]
    #[must_use]
    pub fn new(location: LocationPath, value: ParamValue) -> Self {
        Self { location, value }
    }
}

/// Apply edits to a copy of `document`
///
/// Each location is walked key by key through nested objects; the last key
/// must already exist, so an edit can only replace a declared field.
///
/// # Errors
/// Returns [`EditError::InvalidLocation`] for the first edit whose location
/// cannot be reached
pub fn apply_edits(document: &JsonValue, edits: &[FieldEdit]) -> Result<JsonValue, EditError> {
    let mut updated = document.clone();
    for edit in edits {
        let target = locate_mut(&mut updated, &edit.location)?;
        *target = edit.value.to_json();
    }
    Ok(updated)
}

fn locate_mut<'a>(document: &'a mut JsonValue, location: &LocationPath) -> Result<&'a mut JsonValue, EditError> {
    if location.is_empty() {
        return Err(EditError::InvalidLocation {
            location: location.clone(),
            reason: "empty location".to_string(),
        });
    }

    let mut current = document;
    for segment in location.iter() {
        let JsonValue::Object(map) = current else {
            return Err(EditError::InvalidLocation {
                location: location.clone(),
                reason: format!("'{segment}' is not inside an object"),
            });
        };
        current = map.get_mut(segment).ok_or_else(|| EditError::InvalidLocation {
            location: location.clone(),
            reason: format!("no field '{segment}'"),
        })?;
    }
    Ok(current)
}

/// Edit errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Location does not name a field of the document
    #[error("cannot edit '{location}': {reason}")]
    InvalidLocation { location: LocationPath, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> JsonValue {
        json!({
            "type": "SimulationsForm",
            "initialize": {"type": "SimulationsInitialize", "param_a": [1, 2]},
            "stimuli": {"s1": {"type": "SynchronousSingleSpikeStimulus", "probability": [0.1, 0.5]}}
        })
    }

    #[test]
    fn apply_replaces_fields() {
        let edits = vec![
            FieldEdit::new("initialize.param_a".parse().unwrap(), ParamValue::Int(2)),
            FieldEdit::new("stimuli.s1.probability".parse().unwrap(), ParamValue::Float(0.5)),
        ];
        let updated = apply_edits(&document(), &edits).unwrap();
        assert_eq!(updated["initialize"]["param_a"], json!(2));
        assert_eq!(updated["stimuli"]["s1"]["probability"], json!(0.5));
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let original = document();
        let edits = vec![FieldEdit::new("initialize.param_a".parse().unwrap(), ParamValue::Int(1))];
        let _ = apply_edits(&original, &edits).unwrap();
        assert_eq!(original["initialize"]["param_a"], json!([1, 2]));
    }

    #[test]
    fn apply_tuple_value() {
        let edits = vec![FieldEdit::new(
            "initialize.param_a".parse().unwrap(),
            ParamValue::Tuple(vec![ParamValue::Int(0), ParamValue::Int(5)]),
        )];
        let updated = apply_edits(&document(), &edits).unwrap();
        assert_eq!(updated["initialize"]["param_a"], json!([0, 5]));
    }

    #[test]
    fn apply_unknown_field_fails() {
        let edits = vec![FieldEdit::new("initialize.missing".parse().unwrap(), ParamValue::Int(1))];
        let err = apply_edits(&document(), &edits).unwrap_err();
        assert!(err.to_string().contains("initialize.missing"));
    }

    #[test]
    fn apply_through_scalar_fails() {
        let edits = vec![FieldEdit::new("type.inner".parse().unwrap(), ParamValue::Int(1))];
        assert!(matches!(
            apply_edits(&document(), &edits),
            Err(EditError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn apply_empty_location_fails() {
        let edits = vec![FieldEdit::new(LocationPath::root(), ParamValue::Int(1))];
        assert!(apply_edits(&document(), &edits).is_err());
    }
}
