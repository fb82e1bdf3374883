//! Domain models used by the backend: audio clips, where they came from, and
//! the per-user activity log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where did we get the clip from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClipSource {
  Catalog, // from the TOML catalog
  Admin,   // registered at runtime through the admin API
  Seed,    // built-in seeds (last resort)
}

/// One listening item. The audio bytes live in external storage; we only keep the URL.
#[derive(Clone, Debug, Serialize)]
pub struct AudioClip {
  pub id: String,
  pub text: Option<String>,
  pub audio_path: String,
  pub file_size: u64,
  pub folder_name: String,
  pub file_name: String,
  /// Masked transcript, blanks marked with `***`.
  pub miss_text: Option<String>,
  pub chinese: Option<String>,
  pub original_text: Option<String>,
  pub created_at: DateTime<Utc>,
  pub source: ClipSource,
}

impl AudioClip {
  /// A clip can be served as a test only once all three texts are filled in.
  pub fn is_practicable(&self) -> bool {
    self.miss_text.is_some() && self.original_text.is_some() && self.chinese.is_some()
  }
}

/// Id used when a clip is registered without one.
pub fn clip_id(folder_name: &str, file_name: &str) -> String {
  format!("{}_{}", folder_name, file_name)
}

/// One completed (or abandoned) practice attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
  pub id: String,
  pub user_id: String,
  pub audio_id: String,
  pub is_correct: bool,
  pub user_answer: Option<String>,
  pub correct_answer: Option<String>,
  pub completed_at: Option<DateTime<Utc>>,
  /// Seconds spent on the attempt.
  pub time_spent: Option<u64>,
  #[serde(rename = "created_at")]
  pub created_at: DateTime<Utc>,
}
