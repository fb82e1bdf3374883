//! Per-user practice statistics derived from the activity log.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::{AudioClip, UserActivity};

/// Number of newest activities listed in `recent_activity_list`.
pub const RECENT_LIST_LEN: usize = 10;
/// Window for `recent_activities_count`.
pub const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub total_activities: usize,
  pub correct_activities: usize,
  /// Percentage, one decimal.
  pub accuracy: f64,
  pub total_time_spent: u64,
  pub average_time_spent: u64,
  pub recent_activities_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DayStats {
  pub total: usize,
  pub correct: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
  pub id: String,
  pub is_correct: bool,
  pub time_spent: Option<u64>,
  #[serde(rename = "created_at")]
  pub created_at: DateTime<Utc>,
  pub audio_name: String,
  pub folder_name: String,
  pub original_text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
  pub user_id: String,
  pub summary: Summary,
  /// Keyed by UTC date, `YYYY-MM-DD`.
  pub daily_stats: BTreeMap<String, DayStats>,
  pub recent_activity_list: Vec<RecentActivity>,
}

/// Aggregate one user's activities. `activities` may be in any order.
pub fn compute(
  user_id: &str,
  activities: &[UserActivity],
  clips: &HashMap<String, AudioClip>,
  now: DateTime<Utc>,
) -> UserStats {
  let mut sorted: Vec<&UserActivity> = activities.iter().collect();
  sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));

  let total = sorted.len();
  let correct = sorted.iter().filter(|a| a.is_correct).count();
  let accuracy = if total > 0 {
    (correct as f64 / total as f64 * 1000.0).round() / 10.0
  } else {
    0.0
  };

  let timed: Vec<u64> = sorted.iter().filter_map(|a| a.time_spent).filter(|t| *t > 0).collect();
  let total_time_spent: u64 = timed.iter().sum();
  let average_time_spent = if timed.is_empty() {
    0
  } else {
    (total_time_spent as f64 / timed.len() as f64).round() as u64
  };

  let since = now - Duration::days(RECENT_WINDOW_DAYS);
  let recent_activities_count = sorted.iter().filter(|a| a.created_at >= since).count();

  let mut daily_stats: BTreeMap<String, DayStats> = BTreeMap::new();
  for a in &sorted {
    let day = daily_stats.entry(a.created_at.format("%Y-%m-%d").to_string()).or_default();
    day.total += 1;
    if a.is_correct {
      day.correct += 1;
    }
  }

  let recent_activity_list = sorted
    .iter()
    .take(RECENT_LIST_LEN)
    .map(|a| {
      let clip = clips.get(&a.audio_id);
      RecentActivity {
        id: a.id.clone(),
        is_correct: a.is_correct,
        time_spent: a.time_spent,
        created_at: a.created_at,
        audio_name: clip.map(|c| c.file_name.clone()).unwrap_or_else(|| "unknown".into()),
        folder_name: clip.map(|c| c.folder_name.clone()).unwrap_or_else(|| "unknown".into()),
        original_text: clip.and_then(|c| c.original_text.clone()).unwrap_or_default(),
      }
    })
    .collect();

  UserStats {
    user_id: user_id.to_string(),
    summary: Summary {
      total_activities: total,
      correct_activities: correct,
      accuracy,
      total_time_spent,
      average_time_spent,
      recent_activities_count,
    },
    daily_stats,
    recent_activity_list,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn activity(id: &str, audio: &str, ok: bool, time: Option<u64>, at: DateTime<Utc>) -> UserActivity {
    UserActivity {
      id: id.into(),
      user_id: "u1".into(),
      audio_id: audio.into(),
      is_correct: ok,
      user_answer: None,
      correct_answer: None,
      completed_at: None,
      time_spent: time,
      created_at: at,
    }
  }

  #[test]
  fn empty_log() {
    let now = Utc::now();
    let s = compute("u1", &[], &HashMap::new(), now);
    assert_eq!(s.summary.total_activities, 0);
    assert_eq!(s.summary.accuracy, 0.0);
    assert_eq!(s.summary.average_time_spent, 0);
    assert!(s.daily_stats.is_empty());
    assert!(s.recent_activity_list.is_empty());
  }

  #[test]
  fn aggregates_summary_and_days() {
    let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
    let log = vec![
      activity("a", "clip", true, Some(30), now - Duration::hours(1)),
      activity("b", "clip", false, None, now - Duration::hours(2)),
      activity("c", "gone", true, Some(45), now - Duration::days(10)),
    ];
    let s = compute("u1", &log, &HashMap::new(), now);

    assert_eq!(s.summary.total_activities, 3);
    assert_eq!(s.summary.correct_activities, 2);
    assert_eq!(s.summary.accuracy, 66.7);
    assert_eq!(s.summary.total_time_spent, 75);
    assert_eq!(s.summary.average_time_spent, 38);
    assert_eq!(s.summary.recent_activities_count, 2);

    assert_eq!(s.daily_stats.get("2024-05-20"), Some(&DayStats { total: 2, correct: 1 }));
    assert_eq!(s.daily_stats.get("2024-05-10"), Some(&DayStats { total: 1, correct: 1 }));
  }

  #[test]
  fn recent_list_is_newest_first_and_capped() {
    let now = Utc::now();
    let log: Vec<UserActivity> = (0..15)
      .map(|i| activity(&format!("a{}", i), "missing", i % 2 == 0, None, now - Duration::minutes(i)))
      .collect();
    let s = compute("u1", &log, &HashMap::new(), now);

    assert_eq!(s.recent_activity_list.len(), RECENT_LIST_LEN);
    assert_eq!(s.recent_activity_list[0].id, "a0");
    assert_eq!(s.recent_activity_list[0].audio_name, "unknown");
  }
}
