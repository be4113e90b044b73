//! Period activity summaries
//!
//! Reduces raw activity events for two adjacent windows into flat statistics
//! and compares them category by category. Everything here is pure; fetching
//! the events is the backend's job.

use crate::models::{ActivityEvent, ActivityPayload};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Windows
// ============================================================================

/// Closed interval `[start, end]` in the family's local offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Window {
    /// Window covering whole local days `first..=last`
    pub fn days(first: NaiveDate, last: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            start: start_of_day(first, offset),
            end: end_of_day(last, offset),
        }
    }

    pub fn contains(&self, at: DateTime<FixedOffset>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// The current window ending today and the equal-length window before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindows {
    pub current: Window,
    pub previous: Window,
}

fn local_to_fixed(local: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = local - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, offset)
}

pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    local_to_fixed(date.and_time(NaiveTime::MIN), offset)
}

/// Last representable millisecond of the local day
pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    start_of_day(date, offset) + Duration::days(1) - Duration::milliseconds(1)
}

/// Compute the current and previous windows for a period of `days` days
///
/// The current window includes `today` and the `days - 1` days before it.
/// The previous window is the same length and ends the day before the
/// current one starts, so the two never overlap.
pub fn period_windows(today: NaiveDate, days: u32, offset: FixedOffset) -> PeriodWindows {
    let days = i64::from(days.max(1));

    let current_start = today - Duration::days(days - 1);
    let previous_end = current_start - Duration::days(1);
    let previous_start = current_start - Duration::days(days);

    PeriodWindows {
        current: Window::days(current_start, today, offset),
        previous: Window::days(previous_start, previous_end, offset),
    }
}

fn local_date(at: DateTime<chrono::Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

// ============================================================================
// Event Bundles
// ============================================================================

/// Events of one window, split by the categories that feed statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityBundle {
    pub feedings: Vec<ActivityEvent>,
    pub sleeps: Vec<ActivityEvent>,
    pub diapers: Vec<ActivityEvent>,
    pub temperatures: Vec<ActivityEvent>,
    pub medicines: Vec<ActivityEvent>,
}

impl ActivityBundle {
    /// Partition events by category; bath and play events are dropped
    pub fn from_events(events: impl IntoIterator<Item = ActivityEvent>) -> Self {
        let mut bundle = Self::default();
        for event in events {
            match event.payload {
                ActivityPayload::Feeding { .. } => bundle.feedings.push(event),
                ActivityPayload::Sleep { .. } => bundle.sleeps.push(event),
                ActivityPayload::Diaper { .. } => bundle.diapers.push(event),
                ActivityPayload::Temperature { .. } => bundle.temperatures.push(event),
                ActivityPayload::Medicine { .. } => bundle.medicines.push(event),
                ActivityPayload::Bath | ActivityPayload::Play => {}
            }
        }
        bundle
    }

    pub fn is_empty(&self) -> bool {
        self.feedings.is_empty()
            && self.sleeps.is_empty()
            && self.diapers.is_empty()
            && self.temperatures.is_empty()
            && self.medicines.is_empty()
    }
}

// ============================================================================
// Daily Rollups
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyFeedingRollup {
    pub date: NaiveDate,
    pub count: u32,
    pub total_amount_ml: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySleepRollup {
    pub date: NaiveDate,
    pub count: u32,
    pub total_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDiaperRollup {
    pub date: NaiveDate,
    pub count: u32,
    pub stool_count: u32,
    pub urine_count: u32,
}

/// Per-day feeding count and summed amount; events without an amount
/// count but add nothing to the total
pub fn feeding_rollups<'a>(
    events: impl IntoIterator<Item = &'a ActivityEvent>,
    offset: FixedOffset,
) -> Vec<DailyFeedingRollup> {
    let mut days: BTreeMap<NaiveDate, DailyFeedingRollup> = BTreeMap::new();

    for event in events {
        let ActivityPayload::Feeding { amount_ml, .. } = &event.payload else {
            continue;
        };
        let date = local_date(event.started_at, offset);
        let day = days.entry(date).or_insert(DailyFeedingRollup {
            date,
            count: 0,
            total_amount_ml: 0.0,
        });
        day.count += 1;
        day.total_amount_ml += amount_ml.filter(|a| a.is_finite() && *a > 0.0).unwrap_or(0.0);
    }

    days.into_values().collect()
}

/// Per-day sleep count and summed minutes; sleeps still in progress count
/// but add nothing to the total
pub fn sleep_rollups<'a>(
    events: impl IntoIterator<Item = &'a ActivityEvent>,
    offset: FixedOffset,
) -> Vec<DailySleepRollup> {
    let mut days: BTreeMap<NaiveDate, DailySleepRollup> = BTreeMap::new();

    for event in events {
        if !matches!(event.payload, ActivityPayload::Sleep { .. }) {
            continue;
        }
        let date = local_date(event.started_at, offset);
        let day = days.entry(date).or_insert(DailySleepRollup {
            date,
            count: 0,
            total_minutes: 0,
        });
        day.count += 1;
        day.total_minutes += event.duration_minutes().unwrap_or(0);
    }

    days.into_values().collect()
}

/// Per-day diaper count split into stool and urine; a "both" change counts
/// toward each
pub fn diaper_rollups<'a>(
    events: impl IntoIterator<Item = &'a ActivityEvent>,
    offset: FixedOffset,
) -> Vec<DailyDiaperRollup> {
    let mut days: BTreeMap<NaiveDate, DailyDiaperRollup> = BTreeMap::new();

    for event in events {
        let ActivityPayload::Diaper { diaper_type, .. } = &event.payload else {
            continue;
        };
        let date = local_date(event.started_at, offset);
        let day = days.entry(date).or_insert(DailyDiaperRollup {
            date,
            count: 0,
            stool_count: 0,
            urine_count: 0,
        });
        day.count += 1;
        if diaper_type.has_stool() {
            day.stool_count += 1;
        }
        if diaper_type.has_urine() {
            day.urine_count += 1;
        }
    }

    days.into_values().collect()
}

// ============================================================================
// Period Statistics
// ============================================================================

/// Flat statistics for one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub feeding_count: u32,
    /// Mean amount per feeding in ml, rounded to the nearest integer
    pub feeding_avg_amount: i64,
    pub sleep_count: u32,
    /// Mean hours per sleep, one decimal
    pub sleep_avg_hours: f64,
    pub diaper_count: u32,
    pub stool_count: u32,
    pub urine_count: u32,
    pub medicine_count: u32,
    pub temperature_count: u32,
}

impl PeriodStats {
    pub fn from_bundle(bundle: &ActivityBundle, offset: FixedOffset) -> Self {
        let feedings = feeding_rollups(&bundle.feedings, offset);
        let sleeps = sleep_rollups(&bundle.sleeps, offset);
        let diapers = diaper_rollups(&bundle.diapers, offset);

        let feeding_count: u32 = feedings.iter().map(|d| d.count).sum();
        let feeding_total: f64 = feedings.iter().map(|d| d.total_amount_ml).sum();
        let sleep_count: u32 = sleeps.iter().map(|d| d.count).sum();
        let sleep_minutes: i64 = sleeps.iter().map(|d| d.total_minutes).sum();

        let feeding_avg_amount = if feeding_count > 0 {
            (feeding_total / f64::from(feeding_count)).round() as i64
        } else {
            0
        };

        let sleep_avg_hours = if sleep_count > 0 {
            let hours = sleep_minutes as f64 / f64::from(sleep_count) / 60.0;
            (hours * 10.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            feeding_count,
            feeding_avg_amount,
            sleep_count,
            sleep_avg_hours,
            diaper_count: diapers.iter().map(|d| d.count).sum(),
            stool_count: diapers.iter().map(|d| d.stool_count).sum(),
            urine_count: diapers.iter().map(|d| d.urine_count).sum(),
            medicine_count: bundle.medicines.len() as u32,
            temperature_count: bundle.temperatures.len() as u32,
        }
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// Period-over-period trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increased,
    Decreased,
    Unchanged,
    FirstTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// current - previous
    pub diff: i64,
    pub trend: Trend,
    pub message: String,
}

/// Compare two counts; `label` only shapes the message
///
/// The order of checks matters: a zero previous count is reported as a
/// first occurrence before any increase is considered.
pub fn compare_values(current: u32, previous: u32, label: &str) -> ComparisonResult {
    let diff = i64::from(current) - i64::from(previous);

    let (trend, message) = if previous == 0 && current > 0 {
        (Trend::FirstTime, format!("First {} recorded this period", label))
    } else if previous == 0 && current == 0 {
        (Trend::Unchanged, format!("No {} records in either period", label))
    } else if diff > 0 {
        (Trend::Increased, format!("{}: {} more than last period", capitalize(label), diff))
    } else if diff < 0 {
        (Trend::Decreased, format!("{}: {} fewer than last period", capitalize(label), -diff))
    } else {
        (Trend::Unchanged, format!("{}: similar to last period", capitalize(label)))
    };

    ComparisonResult { diff, trend, message }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One comparison per tracked category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryComparisons {
    pub feeding: ComparisonResult,
    pub sleep: ComparisonResult,
    pub diaper: ComparisonResult,
    pub medicine: ComparisonResult,
}

impl CategoryComparisons {
    pub fn between(current: &PeriodStats, previous: &PeriodStats) -> Self {
        Self {
            feeding: compare_values(current.feeding_count, previous.feeding_count, "feeding"),
            sleep: compare_values(current.sleep_count, previous.sleep_count, "sleep"),
            diaper: compare_values(current.diaper_count, previous.diaper_count, "diaper"),
            medicine: compare_values(current.medicine_count, previous.medicine_count, "medicine"),
        }
    }
}

/// Summary of the current period against the previous one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub days: u32,
    pub windows: PeriodWindows,
    pub current: PeriodStats,
    pub previous: PeriodStats,
    pub comparisons: CategoryComparisons,
}

impl PeriodSummary {
    pub fn build(
        days: u32,
        windows: PeriodWindows,
        current: &ActivityBundle,
        previous: &ActivityBundle,
        offset: FixedOffset,
    ) -> Self {
        let current = PeriodStats::from_bundle(current, offset);
        let previous = PeriodStats::from_bundle(previous, offset);
        let comparisons = CategoryComparisons::between(&current, &previous);

        Self {
            days,
            windows,
            current,
            previous,
            comparisons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiaperType, FeedingType, MedicineUnit, SleepType};
    use chrono::{TimeZone, Timelike, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn event(at: DateTime<Utc>, payload: ActivityPayload) -> ActivityEvent {
        ActivityEvent {
            id: Uuid::new_v4(),
            baby_id: Uuid::nil(),
            started_at: at,
            ended_at: None,
            payload,
            note: None,
        }
    }

    fn feeding(at: DateTime<Utc>, amount: Option<f64>) -> ActivityEvent {
        event(
            at,
            ActivityPayload::Feeding {
                feeding_type: FeedingType::Formula,
                amount_ml: amount,
                duration_minutes: None,
                side: None,
            },
        )
    }

    fn sleep(at: DateTime<Utc>, minutes: Option<i64>) -> ActivityEvent {
        let mut e = event(at, ActivityPayload::Sleep { sleep_type: SleepType::Nap });
        e.ended_at = minutes.map(|m| at + Duration::minutes(m));
        e
    }

    fn diaper(at: DateTime<Utc>, diaper_type: DiaperType) -> ActivityEvent {
        event(at, ActivityPayload::Diaper { diaper_type, stool_condition: None })
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    // ========================================================================
    // Window Tests
    // ========================================================================

    #[test]
    fn test_seven_day_windows() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let windows = period_windows(today, 7, utc());

        assert_eq!(windows.current.start.to_rfc3339(), "2024-06-09T00:00:00+00:00");
        assert_eq!(windows.current.end.date_naive(), today);
        assert_eq!(windows.current.end.time().hour(), 23);
        assert_eq!(windows.current.end.timestamp_subsec_millis(), 999);

        assert_eq!(windows.previous.start.to_rfc3339(), "2024-06-02T00:00:00+00:00");
        assert_eq!(
            windows.previous.end.date_naive(),
            NaiveDate::from_ymd_opt(2024, 6, 8).unwrap()
        );
        assert_eq!(windows.previous.end + Duration::milliseconds(1), windows.current.start);
    }

    #[test]
    fn test_windows_respect_offset() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let windows = period_windows(today, 1, kst());
        // Local midnight in +09:00 is 15:00 UTC the previous day
        assert_eq!(
            windows.current.start.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 6, 14, 15, 0, 0).unwrap()
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_windows_contiguous_and_equal(days in 1u32..120, day_offset in 0i64..2000) {
            let today = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(day_offset);
            let w = period_windows(today, days, kst());

            prop_assert_eq!(w.previous.end + Duration::milliseconds(1), w.current.start);
            prop_assert_eq!(w.current.end - w.current.start, w.previous.end - w.previous.start);
            prop_assert_eq!(
                (w.current.end - w.current.start + Duration::milliseconds(1)).num_days(),
                days as i64
            );
        }
    }

    // ========================================================================
    // Rollup Tests
    // ========================================================================

    #[test]
    fn test_feeding_rollups_group_by_day() {
        let events = vec![
            feeding(at(10, 1), Some(120.0)),
            feeding(at(10, 5), Some(100.0)),
            feeding(at(11, 2), None),
        ];
        let rollups = feeding_rollups(&events, utc());
        assert_eq!(rollups.len(), 2);
        assert_eq!(rollups[0].count, 2);
        assert_eq!(rollups[0].total_amount_ml, 220.0);
        assert_eq!(rollups[1].count, 1);
        assert_eq!(rollups[1].total_amount_ml, 0.0);
    }

    #[test]
    fn test_rollup_day_follows_local_offset() {
        // 16:00 UTC on the 10th is 01:00 on the 11th in +09:00
        let events = vec![feeding(at(10, 16), Some(90.0))];
        let rollups = feeding_rollups(&events, kst());
        assert_eq!(rollups[0].date, NaiveDate::from_ymd_opt(2024, 6, 11).unwrap());
    }

    #[test]
    fn test_sleep_without_end_counts_but_adds_nothing() {
        let events = vec![sleep(at(10, 1), Some(90)), sleep(at(10, 13), None)];
        let rollups = sleep_rollups(&events, utc());
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].count, 2);
        assert_eq!(rollups[0].total_minutes, 90);
    }

    #[test]
    fn test_both_diaper_counts_stool_and_urine() {
        let events = vec![
            diaper(at(12, 8), DiaperType::Both),
            diaper(at(12, 9), DiaperType::Urine),
        ];
        let rollups = diaper_rollups(&events, utc());
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].count, 2);
        assert_eq!(rollups[0].stool_count, 1);
        assert_eq!(rollups[0].urine_count, 2);
    }

    #[test]
    fn test_rollups_over_borrowed_subset() {
        let events = vec![
            feeding(at(10, 1), Some(120.0)),
            sleep(at(10, 2), Some(60)),
            feeding(at(10, 5), Some(80.0)),
        ];
        let subset: Vec<&ActivityEvent> = events.iter().filter(|e| e.started_at > at(10, 1)).collect();
        let rollups = feeding_rollups(subset.iter().copied(), utc());
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].count, 1);
        assert_eq!(rollups[0].total_amount_ml, 80.0);
        assert_eq!(sleep_rollups(subset, utc())[0].total_minutes, 60);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_diaper_rollups_conserve_events(kinds in prop::collection::vec(0u8..3, 0..40)) {
            let events: Vec<_> = kinds
                .iter()
                .enumerate()
                .map(|(i, k)| {
                    let kind = match k {
                        0 => DiaperType::Urine,
                        1 => DiaperType::Stool,
                        _ => DiaperType::Both,
                    };
                    diaper(at(1 + (i as u32 % 20), 6), kind)
                })
                .collect();

            let rollups = diaper_rollups(&events, utc());
            let count: u32 = rollups.iter().map(|d| d.count).sum();
            let stool: u32 = rollups.iter().map(|d| d.stool_count).sum();
            let urine: u32 = rollups.iter().map(|d| d.urine_count).sum();
            let both = kinds.iter().filter(|k| **k == 2).count() as u32;

            prop_assert_eq!(count as usize, events.len());
            prop_assert_eq!(stool + urine, count + both);
        }
    }

    // ========================================================================
    // Period Stats Tests
    // ========================================================================

    #[test]
    fn test_period_stats_averages() {
        let bundle = ActivityBundle::from_events(vec![
            feeding(at(10, 1), Some(100.0)),
            feeding(at(10, 4), Some(125.0)),
            feeding(at(11, 4), Some(130.0)),
            sleep(at(10, 1), Some(120)),
            sleep(at(11, 1), Some(60)),
            sleep(at(11, 9), None),
            diaper(at(10, 2), DiaperType::Both),
            event(at(10, 3), ActivityPayload::Temperature { celsius: 37.8 }),
            event(
                at(10, 4),
                ActivityPayload::Medicine {
                    name: "Ibuprofen".to_string(),
                    amount: 4.0,
                    unit: MedicineUnit::Ml,
                },
            ),
            event(at(10, 5), ActivityPayload::Bath),
        ]);

        let stats = PeriodStats::from_bundle(&bundle, utc());
        assert_eq!(stats.feeding_count, 3);
        // 355 / 3 = 118.33
        assert_eq!(stats.feeding_avg_amount, 118);
        assert_eq!(stats.sleep_count, 3);
        // 180 minutes / 3 sleeps / 60 = 1.0
        assert_eq!(stats.sleep_avg_hours, 1.0);
        assert_eq!(stats.diaper_count, 1);
        assert_eq!(stats.stool_count, 1);
        assert_eq!(stats.urine_count, 1);
        assert_eq!(stats.temperature_count, 1);
        assert_eq!(stats.medicine_count, 1);
    }

    #[test]
    fn test_empty_bundle_has_zero_averages() {
        let stats = PeriodStats::from_bundle(&ActivityBundle::default(), utc());
        assert_eq!(stats, PeriodStats::default());
        assert_eq!(stats.feeding_avg_amount, 0);
        assert_eq!(stats.sleep_avg_hours, 0.0);
    }

    // ========================================================================
    // Comparator Tests
    // ========================================================================

    #[test]
    fn test_compare_increase() {
        let result = compare_values(10, 7, "feeding");
        assert_eq!(result.diff, 3);
        assert_eq!(result.trend, Trend::Increased);
        assert!(result.message.contains("3 more than last period"));
    }

    #[test]
    fn test_compare_decrease_reports_absolute_difference() {
        let result = compare_values(4, 9, "diaper");
        assert_eq!(result.diff, -5);
        assert_eq!(result.trend, Trend::Decreased);
        assert!(result.message.contains("5 fewer than last period"));
    }

    #[test]
    fn test_compare_first_time_and_empty() {
        let first = compare_values(2, 0, "medicine");
        assert_eq!(first.trend, Trend::FirstTime);
        assert!(first.message.starts_with("First medicine"));

        let none = compare_values(0, 0, "medicine");
        assert_eq!(none.trend, Trend::Unchanged);
        assert!(none.message.contains("No medicine records"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_compare_diff_is_difference(a in 0u32..10_000, b in 0u32..10_000) {
            let result = compare_values(a, b, "sleep");
            prop_assert_eq!(result.diff, a as i64 - b as i64);
        }

        #[test]
        fn prop_compare_zero_previous_is_first_time(c in 1u32..10_000) {
            prop_assert_eq!(compare_values(c, 0, "sleep").trend, Trend::FirstTime);
        }

        #[test]
        fn prop_compare_equal_is_unchanged(c in 0u32..10_000) {
            prop_assert_eq!(compare_values(c, c, "sleep").trend, Trend::Unchanged);
        }

        #[test]
        fn prop_compare_trend_matches_sign(a in 0u32..10_000, b in 1u32..10_000) {
            let result = compare_values(a, b, "sleep");
            let expected = match a.cmp(&b) {
                std::cmp::Ordering::Greater => Trend::Increased,
                std::cmp::Ordering::Less => Trend::Decreased,
                std::cmp::Ordering::Equal => Trend::Unchanged,
            };
            prop_assert_eq!(result.trend, expected);
        }
    }

    #[test]
    fn test_summary_build_is_deterministic() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let windows = period_windows(today, 7, utc());
        let current = ActivityBundle::from_events(vec![feeding(at(14, 3), Some(100.0))]);
        let previous = ActivityBundle::default();

        let a = PeriodSummary::build(7, windows, &current, &previous, utc());
        let b = PeriodSummary::build(7, windows, &current, &previous, utc());
        assert_eq!(a, b);
        assert_eq!(a.comparisons.feeding.trend, Trend::FirstTime);
        assert_eq!(a.comparisons.sleep.trend, Trend::Unchanged);
    }
}
