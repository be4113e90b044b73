//! Activity context for the assistant
//!
//! Formats a rolling window of activity into plain text, one section per
//! local day with a totals line. The formatted snapshot is cached per baby
//! but rebuilt whenever anything was written inside the freshness window.

use super::cache::ContextCache;
use super::cipher::MessageCipher;
use crate::config::InsightsConfig;
use crate::error::ApiError;
use crate::repositories::{ActivityRepository, ChatRepository};
use babylog_shared::models::{ActivityCategory, ActivityEvent, ActivityPayload};
use babylog_shared::summary::{diaper_rollups, feeding_rollups, period_windows, sleep_rollups, Window};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, warn};
use uuid::Uuid;

/// Where the activity context for a request comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// Serve the cached snapshot when present
    Cache,
    /// Rebuild from the database and write the snapshot back
    Rebuild,
}

impl ContextSource {
    /// A write inside the freshness window always forces a rebuild
    pub fn choose(cache_enabled: bool, recently_written: bool) -> Self {
        if cache_enabled && !recently_written {
            Self::Cache
        } else {
            Self::Rebuild
        }
    }
}

/// Formatted activity text for the last `settings.context_days` days
pub async fn activity_context(
    pool: &PgPool,
    cache: &ContextCache,
    settings: &InsightsConfig,
    baby_id: Uuid,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let key = ContextCache::key(baby_id, settings.context_days);
    let since = now - Duration::seconds(settings.freshness_window_secs);

    let recently_written = ActivityRepository::has_writes_since(pool, baby_id, since)
        .await
        .map_err(ApiError::Internal)?;

    match ContextSource::choose(cache.is_enabled(), recently_written) {
        ContextSource::Cache => {
            if let Some(cached) = cache.get(&key).await {
                return Ok(cached);
            }
        }
        ContextSource::Rebuild if recently_written => {
            debug!(%baby_id, "recent writes, bypassing context cache");
        }
        ContextSource::Rebuild => {}
    }

    let offset = settings.offset();
    let today = now.with_timezone(&offset).date_naive();
    let window = period_windows(today, settings.context_days, offset).current;

    let categories: Vec<&str> = ActivityCategory::ALL.iter().map(|c| c.as_str()).collect();
    let events = ActivityRepository::list_in_window(
        pool,
        baby_id,
        window.start.with_timezone(&Utc),
        window.end.with_timezone(&Utc),
        &categories,
    )
    .await
    .map_err(ApiError::Internal)?;

    let text = format_activity_log(&events, window, offset);
    cache.set(&key, &text).await;
    Ok(text)
}

/// Decrypted summaries of earlier turns, most recent first
///
/// Summaries that fail to decrypt are skipped.
pub async fn prior_summaries(
    pool: &PgPool,
    cipher: &MessageCipher,
    baby_id: Uuid,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<String>, ApiError> {
    let sealed = ChatRepository::recent_summaries(pool, baby_id, user_id, limit)
        .await
        .map_err(ApiError::Internal)?;

    Ok(decrypt_all(cipher, &sealed))
}

pub(crate) fn decrypt_all(cipher: &MessageCipher, sealed: &[String]) -> Vec<String> {
    sealed
        .iter()
        .filter_map(|s| match cipher.decrypt(s) {
            Ok(plain) if !plain.trim().is_empty() => Some(plain),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "skipping undecryptable chat summary");
                None
            }
        })
        .collect()
}

// ============================================================================
// Formatting
// ============================================================================

/// Render events of one window as a day-by-day log
pub fn format_activity_log(events: &[ActivityEvent], window: Window, offset: FixedOffset) -> String {
    let first = window.start.date_naive();
    let last = window.end.date_naive();
    let days = (last - first).num_days() + 1;

    let mut out = String::new();
    let _ = writeln!(out, "Activity log for the last {} days ({} to {}):", days, first, last);

    if events.is_empty() {
        out.push_str("No activities were recorded in this period.\n");
        return out;
    }

    let mut by_day: BTreeMap<NaiveDate, Vec<&ActivityEvent>> = BTreeMap::new();
    for event in events {
        let date = event.started_at.with_timezone(&offset).date_naive();
        by_day.entry(date).or_default().push(event);
    }

    for (date, mut day_events) in by_day {
        day_events.sort_by_key(|e| e.started_at);
        let _ = writeln!(out, "\n{}", date);
        for event in &day_events {
            let _ = writeln!(out, "- {}", describe_event(event, offset));
        }

        if let Some(totals) = day_totals(&day_events, offset) {
            let _ = writeln!(out, "Totals: {}", totals);
        }
    }

    out
}

fn day_totals(events: &[&ActivityEvent], offset: FixedOffset) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(f) = feeding_rollups(events.iter().copied(), offset).first() {
        if f.total_amount_ml > 0.0 {
            parts.push(format!("{} feedings ({:.0} ml)", f.count, f.total_amount_ml));
        } else {
            parts.push(format!("{} feedings", f.count));
        }
    }
    if let Some(s) = sleep_rollups(events.iter().copied(), offset).first() {
        let hours = s.total_minutes as f64 / 60.0;
        parts.push(format!("{} sleeps ({:.1} h)", s.count, hours));
    }
    if let Some(d) = diaper_rollups(events.iter().copied(), offset).first() {
        parts.push(format!(
            "{} diapers ({} stool, {} urine)",
            d.count, d.stool_count, d.urine_count
        ));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn describe_event(event: &ActivityEvent, offset: FixedOffset) -> String {
    let start = event.started_at.with_timezone(&offset).format("%H:%M");
    let time = match event.ended_at {
        Some(end) => format!("{}-{}", start, end.with_timezone(&offset).format("%H:%M")),
        None => start.to_string(),
    };

    let body = match &event.payload {
        ActivityPayload::Feeding {
            feeding_type,
            amount_ml,
            duration_minutes,
            side,
        } => {
            let mut s = format!("Feeding: {}", label(feeding_type));
            if let Some(amount) = amount_ml {
                let _ = write!(s, " {:.0} ml", amount);
            }
            if let Some(minutes) = duration_minutes {
                let _ = write!(s, " for {} min", minutes);
            }
            if let Some(side) = side {
                let _ = write!(s, " ({} side)", label(side));
            }
            s
        }
        ActivityPayload::Sleep { sleep_type } => match event.duration_minutes() {
            Some(minutes) => format!("Sleep ({}, {} min)", label(sleep_type), minutes),
            None => format!("Sleep ({}, still sleeping or no end time)", label(sleep_type)),
        },
        ActivityPayload::Diaper {
            diaper_type,
            stool_condition,
        } => match stool_condition {
            Some(condition) => format!("Diaper: {} ({})", label(diaper_type), label(condition)),
            None => format!("Diaper: {}", label(diaper_type)),
        },
        ActivityPayload::Temperature { celsius } => format!("Temperature: {:.1} °C", celsius),
        ActivityPayload::Medicine { name, amount, unit } => {
            format!("Medicine: {} {} {}", name, amount, unit.symbol())
        }
        ActivityPayload::Bath => "Bath".to_string(),
        ActivityPayload::Play => "Play".to_string(),
    };

    match event.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{} {} (note: {})", time, body, note),
        None => format!("{} {}", time, body),
    }
}

/// Human label from a snake_case serde name
fn label<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s.replace('_', " "),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEVELOPMENT_ENCRYPTION_KEY;
    use babylog_shared::models::{DiaperType, FeedingType, SleepType};
    use chrono::TimeZone;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn event(local: (u32, u32, u32), minutes: Option<i64>, payload: ActivityPayload) -> ActivityEvent {
        let start = kst()
            .with_ymd_and_hms(2024, 6, local.0, local.1, local.2, 0)
            .unwrap()
            .with_timezone(&Utc);
        ActivityEvent {
            id: Uuid::new_v4(),
            baby_id: Uuid::nil(),
            started_at: start,
            ended_at: minutes.map(|m| start + Duration::minutes(m)),
            payload,
            note: None,
        }
    }

    fn window() -> Window {
        period_windows(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 7, kst()).current
    }

    #[test]
    fn test_empty_window() {
        let text = format_activity_log(&[], window(), kst());
        assert!(text.starts_with("Activity log for the last 7 days (2024-06-09 to 2024-06-15):"));
        assert!(text.contains("No activities were recorded"));
    }

    #[test]
    fn test_days_are_cut_in_local_time() {
        // 00:30 KST on the 15th is still the 14th in UTC
        let events = vec![
            event(
                (15, 0, 30),
                None,
                ActivityPayload::Feeding {
                    feeding_type: FeedingType::PumpedMilk,
                    amount_ml: Some(90.0),
                    duration_minutes: None,
                    side: None,
                },
            ),
            event((14, 21, 0), Some(540), ActivityPayload::Sleep { sleep_type: SleepType::Night }),
        ];
        let text = format_activity_log(&events, window(), kst());

        let day14 = text.find("\n2024-06-14\n").unwrap();
        let day15 = text.find("\n2024-06-15\n").unwrap();
        assert!(day14 < day15);
        assert!(text.contains("- 00:30 Feeding: pumped milk 90 ml"));
        assert!(text.contains("- 21:00-06:00 Sleep (night, 540 min)"));
        assert!(text.contains("Totals: 1 sleeps (9.0 h)"));
    }

    #[test]
    fn test_diaper_totals_split_both() {
        let events = vec![
            event((12, 9, 0), None, ActivityPayload::Diaper { diaper_type: DiaperType::Both, stool_condition: None }),
            event((12, 11, 0), None, ActivityPayload::Diaper { diaper_type: DiaperType::Urine, stool_condition: None }),
        ];
        let text = format_activity_log(&events, window(), kst());
        assert!(text.contains("2 diapers (1 stool, 2 urine)"));
    }

    #[test]
    fn test_recent_write_bypasses_cache() {
        assert_eq!(ContextSource::choose(true, true), ContextSource::Rebuild);
    }

    #[test]
    fn test_quiet_window_reads_cache() {
        assert_eq!(ContextSource::choose(true, false), ContextSource::Cache);
    }

    #[test]
    fn test_disabled_cache_always_rebuilds() {
        assert_eq!(ContextSource::choose(false, false), ContextSource::Rebuild);
        assert_eq!(ContextSource::choose(false, true), ContextSource::Rebuild);
    }

    #[test]
    fn test_undecryptable_summaries_are_skipped() {
        let cipher = MessageCipher::from_base64_key(DEVELOPMENT_ENCRYPTION_KEY).unwrap();
        let sealed = vec![
            cipher.encrypt("Asked about a rash.").unwrap(),
            "not-ciphertext".to_string(),
            cipher.encrypt("Discussed night waking.").unwrap(),
        ];
        assert_eq!(
            decrypt_all(&cipher, &sealed),
            vec!["Asked about a rash.".to_string(), "Discussed night waking.".to_string()]
        );
    }
}
