//! Data models for the Babylog application

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Activity category, mirrored by the `category` column of `activities`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Feeding,
    Sleep,
    Diaper,
    Temperature,
    Medicine,
    Bath,
    Play,
}

impl ActivityCategory {
    /// All categories, in display order
    pub const ALL: [ActivityCategory; 7] = [
        ActivityCategory::Feeding,
        ActivityCategory::Sleep,
        ActivityCategory::Diaper,
        ActivityCategory::Temperature,
        ActivityCategory::Medicine,
        ActivityCategory::Bath,
        ActivityCategory::Play,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Feeding => "feeding",
            ActivityCategory::Sleep => "sleep",
            ActivityCategory::Diaper => "diaper",
            ActivityCategory::Temperature => "temperature",
            ActivityCategory::Medicine => "medicine",
            ActivityCategory::Bath => "bath",
            ActivityCategory::Play => "play",
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown activity category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedingType {
    Breast,
    Formula,
    PumpedMilk,
    BabyFood,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreastSide {
    Left,
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepType {
    Nap,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiaperType {
    Urine,
    Stool,
    Both,
}

impl DiaperType {
    pub fn has_stool(&self) -> bool {
        matches!(self, DiaperType::Stool | DiaperType::Both)
    }

    pub fn has_urine(&self) -> bool {
        matches!(self, DiaperType::Urine | DiaperType::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoolCondition {
    Normal,
    Loose,
    Watery,
    Hard,
    Bloody,
    Mucus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicineUnit {
    Ml,
    Mg,
    Tablet,
    Drop,
}

impl MedicineUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            MedicineUnit::Ml => "ml",
            MedicineUnit::Mg => "mg",
            MedicineUnit::Tablet => "tablet",
            MedicineUnit::Drop => "drop",
        }
    }
}

/// Category-specific payload of an activity
///
/// Each variant carries only the fields relevant to its category, so a
/// temperature reading can never carry a feeding amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ActivityPayload {
    Feeding {
        feeding_type: FeedingType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount_ml: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        side: Option<BreastSide>,
    },
    Sleep {
        sleep_type: SleepType,
    },
    Diaper {
        diaper_type: DiaperType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stool_condition: Option<StoolCondition>,
    },
    Temperature {
        celsius: f64,
    },
    Medicine {
        name: String,
        amount: f64,
        unit: MedicineUnit,
    },
    Bath,
    Play,
}

impl ActivityPayload {
    pub fn category(&self) -> ActivityCategory {
        match self {
            ActivityPayload::Feeding { .. } => ActivityCategory::Feeding,
            ActivityPayload::Sleep { .. } => ActivityCategory::Sleep,
            ActivityPayload::Diaper { .. } => ActivityCategory::Diaper,
            ActivityPayload::Temperature { .. } => ActivityCategory::Temperature,
            ActivityPayload::Medicine { .. } => ActivityCategory::Medicine,
            ActivityPayload::Bath => ActivityCategory::Bath,
            ActivityPayload::Play => ActivityCategory::Play,
        }
    }
}

/// One recorded child-care event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub baby_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub payload: ActivityPayload,
    pub note: Option<String>,
}

impl ActivityEvent {
    pub fn category(&self) -> ActivityCategory {
        self.payload.category()
    }

    /// Duration in whole minutes, only when an end time exists and is not
    /// before the start
    pub fn duration_minutes(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_minutes())
            .filter(|m| *m >= 0)
    }
}

/// Gender used for growth reference lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "boy" | "m" => Ok(Gender::Male),
            "female" | "girl" | "f" => Ok(Gender::Female),
            other => Err(format!("Unknown gender: {}", other)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

/// A baby profile owned by a family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baby {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
}

impl Baby {
    /// Age in completed months on the given date
    pub fn age_in_months(&self, on: NaiveDate) -> u32 {
        age_in_months(self.birth_date, on)
    }
}

/// Completed months between two dates, zero when `on` precedes `birth`
pub fn age_in_months(birth: NaiveDate, on: NaiveDate) -> u32 {
    use chrono::Datelike;

    if on <= birth {
        return 0;
    }
    let mut months = (on.year() - birth.year()) * 12 + on.month() as i32 - birth.month() as i32;
    if on.day() < birth.day() {
        months -= 1;
    }
    months.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payload_serializes_with_category_tag() {
        let payload = ActivityPayload::Diaper {
            diaper_type: DiaperType::Both,
            stool_condition: Some(StoolCondition::Loose),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["category"], "diaper");
        assert_eq!(json["diaper_type"], "both");
        assert_eq!(json["stool_condition"], "loose");
    }

    #[test]
    fn test_unit_variants_deserialize() {
        let payload: ActivityPayload = serde_json::from_str(r#"{"category":"bath"}"#).unwrap();
        assert_eq!(payload, ActivityPayload::Bath);
        assert_eq!(payload.category(), ActivityCategory::Bath);
    }

    #[test]
    fn test_feeding_without_amount_deserializes() {
        let payload: ActivityPayload =
            serde_json::from_str(r#"{"category":"feeding","feeding_type":"breast","side":"left"}"#)
                .unwrap();
        match payload {
            ActivityPayload::Feeding { amount_ml, side, .. } => {
                assert!(amount_ml.is_none());
                assert_eq!(side, Some(BreastSide::Left));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("Feeding".parse::<ActivityCategory>().unwrap(), ActivityCategory::Feeding);
        assert!("nap".parse::<ActivityCategory>().is_err());
    }

    #[test]
    fn test_duration_minutes() {
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 13, 0, 0).unwrap();
        let mut event = ActivityEvent {
            id: Uuid::new_v4(),
            baby_id: Uuid::new_v4(),
            started_at: start,
            ended_at: None,
            payload: ActivityPayload::Sleep { sleep_type: SleepType::Nap },
            note: None,
        };
        assert_eq!(event.duration_minutes(), None);

        event.ended_at = Some(start + chrono::Duration::minutes(95));
        assert_eq!(event.duration_minutes(), Some(95));
    }

    #[test]
    fn test_age_in_months() {
        let birth = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert_eq!(age_in_months(birth, NaiveDate::from_ymd_opt(2024, 1, 25).unwrap()), 0);
        assert_eq!(age_in_months(birth, NaiveDate::from_ymd_opt(2024, 2, 19).unwrap()), 0);
        assert_eq!(age_in_months(birth, NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()), 1);
        assert_eq!(age_in_months(birth, NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()), 8);
        assert_eq!(age_in_months(birth, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()), 0);
    }
}
