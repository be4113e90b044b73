//! Babylog WASM Module
//!
//! Browser bindings for the guideline and comparison calculations, so the
//! client can preview results before anything is saved. Structured results
//! cross the boundary as JSON strings.

use babylog_shared::guidelines::{
    acetaminophen_dosage, build_guidelines, feeding_guideline, ibuprofen_dosage, sleep_guideline,
    weight_percentile, Concentrations,
};
use babylog_shared::models::age_in_months;
use babylog_shared::validation::validate_temperature;
use babylog_shared::{compare_values, Gender};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn to_json<T: Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&e.to_string()))
}

fn parse_gender(gender: &str) -> Result<Gender, JsError> {
    gender.parse().map_err(|e: String| JsError::new(&e))
}

/// Positive, finite concentration or none
fn concentration(mg_per_ml: f64) -> Option<f64> {
    (mg_per_ml.is_finite() && mg_per_ml > 0.0).then_some(mg_per_ml)
}

/// Completed months between two `YYYY-MM-DD` dates
#[wasm_bindgen(js_name = ageInMonths)]
pub fn age_months(birth_date: &str, on: &str) -> Result<u32, JsError> {
    let birth = birth_date
        .parse()
        .map_err(|_| JsError::new("birth_date must be YYYY-MM-DD"))?;
    let on = on.parse().map_err(|_| JsError::new("on must be YYYY-MM-DD"))?;
    Ok(age_in_months(birth, on))
}

/// Feeding volume ranges for a weight, as JSON
#[wasm_bindgen(js_name = feedingGuideline)]
pub fn feeding_guideline_json(weight_kg: f64) -> Result<String, JsError> {
    to_json(&feeding_guideline(weight_kg))
}

/// Recommended sleep for an age, as JSON
#[wasm_bindgen(js_name = sleepGuideline)]
pub fn sleep_guideline_json(age_months: u32) -> Result<String, JsError> {
    to_json(&sleep_guideline(age_months))
}

/// Weight percentile band, as JSON
#[wasm_bindgen(js_name = weightPercentile)]
pub fn weight_percentile_json(
    weight_kg: f64,
    age_months: u32,
    gender: &str,
) -> Result<String, JsError> {
    to_json(&weight_percentile(weight_kg, age_months, parse_gender(gender)?))
}

/// Ibuprofen dose for a weight; pass 0 when the syrup strength is unknown
#[wasm_bindgen(js_name = ibuprofenDosage)]
pub fn ibuprofen_dosage_json(weight_kg: f64, mg_per_ml: f64) -> Result<String, JsError> {
    to_json(&ibuprofen_dosage(weight_kg, concentration(mg_per_ml)))
}

/// Acetaminophen dose for a weight; pass 0 when the syrup strength is unknown
#[wasm_bindgen(js_name = acetaminophenDosage)]
pub fn acetaminophen_dosage_json(weight_kg: f64, mg_per_ml: f64) -> Result<String, JsError> {
    to_json(&acetaminophen_dosage(weight_kg, concentration(mg_per_ml)))
}

/// Full guideline set; a non-positive weight omits weight-based guidance
#[wasm_bindgen(js_name = guidelines)]
pub fn guidelines_json(weight_kg: f64, age_months: u32, gender: &str) -> Result<String, JsError> {
    let weight = (weight_kg > 0.0).then_some(weight_kg);
    to_json(&build_guidelines(
        weight,
        age_months,
        parse_gender(gender)?,
        Concentrations::default(),
    ))
}

/// Period-over-period comparison, as JSON
#[wasm_bindgen(js_name = compareValues)]
pub fn compare_values_json(current: u32, previous: u32, label: &str) -> Result<String, JsError> {
    to_json(&compare_values(current, previous, label))
}

/// Whether a reading can be saved as a temperature record
#[wasm_bindgen(js_name = isValidTemperature)]
pub fn is_valid_temperature(celsius: f64) -> bool {
    validate_temperature(celsius).is_ok()
}
