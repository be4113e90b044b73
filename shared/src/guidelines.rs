//! Infant growth, feeding, sleep and dosage guidelines
//!
//! Reference ranges shown alongside a baby's records and injected into the
//! AI consultation context. They are display-only: nothing in the system
//! makes automated decisions from them.
//!
//! # Design Principles
//!
//! 1. **Pure Functions**: no I/O, no errors; out-of-table inputs fall back to
//!    neutral defaults
//! 2. **Explicit Missing Inputs**: concentration-based dosage never guesses a
//!    concentration

use crate::models::Gender;
use serde::{Deserialize, Serialize};

// ============================================================================
// Weight-for-age Percentiles
// ============================================================================

/// Percentile boundaries (kg) for one gender and age: p3, p15, p50, p85, p97
type PercentileRow = [f64; 5];

/// WHO weight-for-age boundaries for boys, 0-12 months
const BOYS_WEIGHT_FOR_AGE: [PercentileRow; 13] = [
    [2.5, 2.9, 3.3, 3.9, 4.3],
    [3.4, 3.9, 4.5, 5.1, 5.7],
    [4.4, 4.9, 5.6, 6.3, 7.0],
    [5.1, 5.6, 6.4, 7.2, 7.9],
    [5.6, 6.2, 7.0, 7.9, 8.6],
    [6.1, 6.7, 7.5, 8.4, 9.2],
    [6.4, 7.1, 7.9, 8.9, 9.7],
    [6.7, 7.4, 8.3, 9.3, 10.2],
    [7.0, 7.7, 8.6, 9.6, 10.5],
    [7.2, 7.9, 8.9, 10.0, 10.9],
    [7.5, 8.2, 9.2, 10.3, 11.2],
    [7.7, 8.4, 9.4, 10.5, 11.5],
    [7.8, 8.6, 9.6, 10.8, 11.8],
];

/// WHO weight-for-age boundaries for girls, 0-12 months
const GIRLS_WEIGHT_FOR_AGE: [PercentileRow; 13] = [
    [2.4, 2.8, 3.2, 3.7, 4.2],
    [3.2, 3.6, 4.2, 4.8, 5.4],
    [4.0, 4.5, 5.1, 5.9, 6.5],
    [4.6, 5.1, 5.8, 6.7, 7.4],
    [5.1, 5.6, 6.4, 7.3, 8.1],
    [5.5, 6.1, 6.9, 7.8, 8.7],
    [5.8, 6.4, 7.3, 8.3, 9.2],
    [6.1, 6.7, 7.6, 8.7, 9.6],
    [6.3, 7.0, 7.9, 9.0, 10.0],
    [6.6, 7.3, 8.2, 9.3, 10.4],
    [6.8, 7.5, 8.5, 9.6, 10.7],
    [7.0, 7.7, 8.7, 9.9, 11.0],
    [7.1, 7.9, 8.9, 10.2, 11.3],
];

const PERCENTILE_MARKS: [u8; 5] = [3, 15, 50, 85, 97];

/// Qualitative band for a weight percentile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentileBand {
    VeryLow,
    Low,
    BelowAverage,
    Average,
    AboveAverage,
    High,
    VeryHigh,
}

impl PercentileBand {
    pub fn description(&self) -> &'static str {
        match self {
            PercentileBand::VeryLow => "Very low (below 3rd percentile)",
            PercentileBand::Low => "Low (3rd-15th percentile)",
            PercentileBand::BelowAverage => "Slightly below average (15th-50th percentile)",
            PercentileBand::Average => "Average",
            PercentileBand::AboveAverage => "Slightly above average (50th-85th percentile)",
            PercentileBand::High => "High (85th-97th percentile)",
            PercentileBand::VeryHigh => "Very high (97th percentile or above)",
        }
    }
}

/// Weight percentile lookup result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightPercentile {
    /// Upper percentile mark of the band the weight falls in
    pub percentile: u8,
    pub band: PercentileBand,
    /// False when the age is outside the reference table
    pub from_reference: bool,
}

impl WeightPercentile {
    /// Neutral fallback used when no reference data exists for the age
    pub const fn neutral() -> Self {
        Self {
            percentile: 50,
            band: PercentileBand::Average,
            from_reference: false,
        }
    }
}

fn reference_row(gender: Gender, age_months: u32) -> Option<&'static PercentileRow> {
    let table = match gender {
        Gender::Male => &BOYS_WEIGHT_FOR_AGE,
        Gender::Female => &GIRLS_WEIGHT_FOR_AGE,
    };
    table.get(age_months as usize)
}

/// Look up which weight-for-age band a weight falls into
///
/// Returns the first boundary the weight is strictly below, or the top band
/// when the weight meets or exceeds p97.
pub fn weight_percentile(weight_kg: f64, age_months: u32, gender: Gender) -> WeightPercentile {
    let Some(row) = reference_row(gender, age_months) else {
        return WeightPercentile::neutral();
    };

    const BANDS: [PercentileBand; 5] = [
        PercentileBand::VeryLow,
        PercentileBand::Low,
        PercentileBand::BelowAverage,
        PercentileBand::AboveAverage,
        PercentileBand::High,
    ];

    for (i, boundary) in row.iter().enumerate() {
        if weight_kg < *boundary {
            return WeightPercentile {
                percentile: PERCENTILE_MARKS[i],
                band: BANDS[i],
                from_reference: true,
            };
        }
    }

    WeightPercentile {
        percentile: 97,
        band: PercentileBand::VeryHigh,
        from_reference: true,
    }
}

// ============================================================================
// Feeding Volume
// ============================================================================

const FEEDING_ML_PER_KG_MIN: f64 = 100.0;
const FEEDING_ML_PER_KG_MAX: f64 = 150.0;
const FEEDINGS_PER_DAY_MIN: f64 = 6.0;
const FEEDINGS_PER_DAY_MAX: f64 = 8.0;

/// Recommended milk volume ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedingGuideline {
    pub daily_min_ml: i64,
    pub daily_max_ml: i64,
    pub per_feeding_min_ml: i64,
    pub per_feeding_max_ml: i64,
}

/// Daily milk volume of 100-150 ml/kg, split across 6-8 feedings
///
/// The per-feeding minimum divides the daily minimum by the most frequent
/// schedule (8), the maximum divides the daily maximum by the least
/// frequent one (6).
pub fn feeding_guideline(weight_kg: f64) -> FeedingGuideline {
    let weight = weight_kg.max(0.0);
    let daily_min = weight * FEEDING_ML_PER_KG_MIN;
    let daily_max = weight * FEEDING_ML_PER_KG_MAX;

    FeedingGuideline {
        daily_min_ml: daily_min.round() as i64,
        daily_max_ml: daily_max.round() as i64,
        per_feeding_min_ml: (daily_min / FEEDINGS_PER_DAY_MAX).round() as i64,
        per_feeding_max_ml: (daily_max / FEEDINGS_PER_DAY_MIN).round() as i64,
    }
}

// ============================================================================
// Sleep Duration
// ============================================================================

/// Recommended total sleep and nap count for an age band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepGuideline {
    pub age_band: String,
    pub total_hours: String,
    pub naps: String,
}

pub fn sleep_guideline(age_months: u32) -> SleepGuideline {
    let (age_band, total_hours, naps) = match age_months {
        0..=3 => ("0-3 months", "14-17 hours", "4-5 naps"),
        4..=11 => ("4-11 months", "12-15 hours", "2-3 naps"),
        12..=24 => ("12-24 months", "11-14 hours", "1-2 naps"),
        _ => ("25+ months", "10-13 hours", "0-1 naps"),
    };

    SleepGuideline {
        age_band: age_band.to_string(),
        total_hours: total_hours.to_string(),
        naps: naps.to_string(),
    }
}

// ============================================================================
// Medicine Dosage
// ============================================================================

pub const DOSAGE_DISCLAIMER: &str = "Dosage guidance is for reference only. \
Always confirm the dose with a pediatrician or pharmacist before giving any medicine.";

/// Standard dexibuprofen syrup strength (mg/ml)
pub const DEXIBUPROFEN_MG_PER_ML: f64 = 12.0;

/// Fever reducers with weight-based dosing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeverReducer {
    Ibuprofen,
    Acetaminophen,
    Dexibuprofen,
}

impl FeverReducer {
    pub fn display_name(&self) -> &'static str {
        match self {
            FeverReducer::Ibuprofen => "Ibuprofen",
            FeverReducer::Acetaminophen => "Acetaminophen",
            FeverReducer::Dexibuprofen => "Dexibuprofen",
        }
    }

    /// (recommended single, max single, max daily) in mg per kg
    fn mg_per_kg(&self) -> (f64, f64, f64) {
        match self {
            FeverReducer::Ibuprofen => (5.0, 10.0, 40.0),
            FeverReducer::Acetaminophen => (10.0, 15.0, 75.0),
            FeverReducer::Dexibuprofen => (5.0, 7.0, 28.0),
        }
    }
}

/// Calculated dose volumes for one medicine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseRange {
    pub medicine: FeverReducer,
    pub mg_per_ml: f64,
    pub recommended_ml: f64,
    pub max_single_ml: f64,
    pub max_daily_ml: f64,
    pub disclaimer: String,
}

/// Dosage guidance, or the reason none could be computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DosageGuideline {
    Calculated(DoseRange),
    MissingConcentration {
        medicine: FeverReducer,
        disclaimer: String,
    },
}

impl DosageGuideline {
    pub fn dose(&self) -> Option<&DoseRange> {
        match self {
            DosageGuideline::Calculated(range) => Some(range),
            DosageGuideline::MissingConcentration { .. } => None,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn dose_for(medicine: FeverReducer, weight_kg: f64, mg_per_ml: f64) -> DoseRange {
    let (recommended, max_single, max_daily) = medicine.mg_per_kg();
    let weight = weight_kg.max(0.0);

    DoseRange {
        medicine,
        mg_per_ml,
        recommended_ml: round1(weight * recommended / mg_per_ml),
        max_single_ml: round1(weight * max_single / mg_per_ml),
        max_daily_ml: round1(weight * max_daily / mg_per_ml),
        disclaimer: DOSAGE_DISCLAIMER.to_string(),
    }
}

fn concentration_dose(
    medicine: FeverReducer,
    weight_kg: f64,
    mg_per_ml: Option<f64>,
) -> DosageGuideline {
    match mg_per_ml.filter(|c| c.is_finite() && *c > 0.0) {
        Some(concentration) => DosageGuideline::Calculated(dose_for(medicine, weight_kg, concentration)),
        None => DosageGuideline::MissingConcentration {
            medicine,
            disclaimer: DOSAGE_DISCLAIMER.to_string(),
        },
    }
}

/// Ibuprofen: 5-10 mg/kg per dose, at most 40 mg/kg per day
pub fn ibuprofen_dosage(weight_kg: f64, mg_per_ml: Option<f64>) -> DosageGuideline {
    concentration_dose(FeverReducer::Ibuprofen, weight_kg, mg_per_ml)
}

/// Acetaminophen: 10-15 mg/kg per dose, at most 75 mg/kg per day
pub fn acetaminophen_dosage(weight_kg: f64, mg_per_ml: Option<f64>) -> DosageGuideline {
    concentration_dose(FeverReducer::Acetaminophen, weight_kg, mg_per_ml)
}

/// Dexibuprofen: 5-7 mg/kg per dose, at most 28 mg/kg per day, standard syrup
pub fn dexibuprofen_dosage(weight_kg: f64) -> DosageGuideline {
    DosageGuideline::Calculated(dose_for(
        FeverReducer::Dexibuprofen,
        weight_kg,
        DEXIBUPROFEN_MG_PER_ML,
    ))
}

// ============================================================================
// Combined Guidelines
// ============================================================================

/// All guidelines for a baby's current weight, age and gender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineSet {
    pub age_months: u32,
    pub weight_kg: Option<f64>,
    pub weight_percentile: Option<WeightPercentile>,
    pub feeding: Option<FeedingGuideline>,
    pub sleep: SleepGuideline,
    pub dosages: Vec<DosageGuideline>,
}

/// Syrup concentrations the caller knows about (mg/ml)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Concentrations {
    pub ibuprofen_mg_per_ml: Option<f64>,
    pub acetaminophen_mg_per_ml: Option<f64>,
}

/// Build every guideline available for the given inputs
///
/// Weight-dependent guidance is omitted when no weight is known.
pub fn build_guidelines(
    weight_kg: Option<f64>,
    age_months: u32,
    gender: Gender,
    concentrations: Concentrations,
) -> GuidelineSet {
    let weight = weight_kg.filter(|w| w.is_finite() && *w > 0.0);

    let dosages = weight
        .map(|w| {
            vec![
                ibuprofen_dosage(w, concentrations.ibuprofen_mg_per_ml),
                acetaminophen_dosage(w, concentrations.acetaminophen_mg_per_ml),
                dexibuprofen_dosage(w),
            ]
        })
        .unwrap_or_default();

    GuidelineSet {
        age_months,
        weight_kg: weight,
        weight_percentile: weight.map(|w| weight_percentile(w, age_months, gender)),
        feeding: weight.map(feeding_guideline),
        sleep: sleep_guideline(age_months),
        dosages,
    }
}
