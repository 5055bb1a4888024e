use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray},
    datatypes::DataType,
};

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a cleaned cell as a finite f64. Empty cells, text and infinities are `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Infer the Arrow dtype for a whole column of raw cells: Float64 when every
/// non-empty cell is numeric, Utf8 otherwise.
pub fn infer_column_dtype<'a>(cells: impl IntoIterator<Item = Option<&'a str>>) -> DataType {
    let all_numeric = cells
        .into_iter()
        .flatten()
        .map(clean_str)
        .filter(|c| !c.is_empty())
        .all(|c| c.parse::<f64>().is_ok());
    if all_numeric {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

/// Round to 2 decimals, ties to even.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

/// Coerce an arbitrary column to optional numbers: Float64 values pass
/// through, text cells are parsed, anything else is missing.
pub fn coerce_numeric(arr: &ArrayRef) -> Vec<Option<f64>> {
    if let Some(farr) = arr.as_any().downcast_ref::<Float64Array>() {
        return farr
            .iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
    }
    if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
        return sarr.iter().map(|v| v.and_then(parse_number)).collect();
    }
    vec![None; arr.len()]
}
