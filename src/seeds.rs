//! Seed data: a couple of built-in clips so the app is usable without a catalog.

use chrono::Utc;

use crate::domain::{clip_id, AudioClip, ClipSource};

fn seed_clip(folder: &str, file: &str, original: &str, masked: &str, chinese: &str) -> AudioClip {
  AudioClip {
    id: clip_id(folder, file),
    text: Some(original.into()),
    audio_path: format!("/audioFiles/{}/{}", folder, file),
    file_size: 0,
    folder_name: folder.into(),
    file_name: file.into(),
    miss_text: Some(masked.into()),
    chinese: Some(chinese.into()),
    original_text: Some(original.into()),
    created_at: Utc::now(),
    source: ClipSource::Seed,
  }
}

/// Minimal set of built-in clips that guarantee there is always something to practise.
pub fn seed_clips() -> Vec<AudioClip> {
  vec![
    seed_clip(
      "seed",
      "weather.flac",
      "The weather is great today",
      "The *** is great ***",
      "今天天气很好。",
    ),
    seed_clip(
      "seed",
      "coffee.flac",
      "I would like a cup of coffee please",
      "I would like a *** of *** please",
      "我想要一杯咖啡。",
    ),
  ]
}
