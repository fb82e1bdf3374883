//! Loading app configuration (grading settings + optional clip catalog) from TOML.
//!
//! See `AppConfig` and `GradingCfg` for expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::cloze::AnswerPolicy;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub grading: GradingCfg,
  #[serde(default)]
  pub clips: Vec<ClipCfg>,
}

/// Catalog entry accepted in TOML configuration.
/// `id` defaults to `<folder_name>_<file_name>`.
#[derive(Clone, Debug, Deserialize)]
pub struct ClipCfg {
  #[serde(default)] pub id: Option<String>,
  pub folder_name: String,
  pub file_name: String,
  pub audio_path: String,
  #[serde(default)] pub file_size: u64,
  #[serde(default)] pub text: Option<String>,
  #[serde(default)] pub miss_text: Option<String>,
  #[serde(default)] pub chinese: Option<String>,
  #[serde(default)] pub original_text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GradingCfg {
  /// What to do when a submission has a different number of answers than blanks.
  pub answer_policy: AnswerPolicy,
  /// Fraction of blanks that must be right for an attempt to be logged as correct.
  pub pass_threshold: f32,
}

impl Default for GradingCfg {
  fn default() -> Self {
    Self { answer_policy: AnswerPolicy::Pad, pass_threshold: 1.0 }
  }
}

impl GradingCfg {
  /// Resets an out-of-range threshold to 1.0.
  pub fn sanitized(mut self) -> Self {
    if !(0.0..=1.0).contains(&self.pass_threshold) {
      error!(target: "listening_backend", pass_threshold = self.pass_threshold, "pass_threshold out of range; using 1.0");
      self.pass_threshold = 1.0;
    }
    self
  }
}

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "listening_backend", %path, clips = cfg.clips.len(), "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "listening_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "listening_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg: AppConfig = toml::from_str("").unwrap();
    assert!(cfg.clips.is_empty());
    assert_eq!(cfg.grading.answer_policy, AnswerPolicy::Pad);
    assert_eq!(cfg.grading.pass_threshold, 1.0);
  }

  #[test]
  fn parses_grading_and_clips() {
    let cfg: AppConfig = toml::from_str(
      r#"
        [grading]
        answer_policy = "reject"
        pass_threshold = 0.8

        [[clips]]
        folder_name = "unit1"
        file_name = "001.flac"
        audio_path = "https://cdn.example.com/audioFiles/unit1/001.flac"
        file_size = 2048
        original_text = "the quick fox"
        miss_text = "the *** fox"
        chinese = "敏捷的狐狸"
      "#,
    )
    .unwrap();

    assert_eq!(cfg.grading.answer_policy, AnswerPolicy::Reject);
    assert_eq!(cfg.grading.pass_threshold, 0.8);
    assert_eq!(cfg.clips.len(), 1);
    let clip = &cfg.clips[0];
    assert!(clip.id.is_none());
    assert_eq!(clip.miss_text.as_deref(), Some("the *** fox"));
    assert_eq!(clip.file_size, 2048);
  }

  #[test]
  fn out_of_range_threshold_is_reset() {
    let cfg = GradingCfg { answer_policy: AnswerPolicy::Pad, pass_threshold: 1.5 }.sanitized();
    assert_eq!(cfg.pass_threshold, 1.0);
  }
}
