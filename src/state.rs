//! Application state: in-memory stores, grading settings, and test selection.
//!
//! This module owns:
//!   - the clip catalog (by id)
//!   - the activity log
//!   - the last clip served to each user (to avoid immediate repeats)
//!   - grading settings (from TOML or defaults)
//!
//! The state is built once at startup and handed to handlers as `Arc<AppState>`.

use std::{collections::HashMap, sync::Arc};

use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

use crate::cloze::check_alignment;
use crate::config::{load_app_config_from_env, AppConfig, GradingCfg};
use crate::domain::{clip_id, AudioClip, ClipSource, UserActivity};
use crate::error::AppError;
use crate::seeds::seed_clips;

#[derive(Clone)]
pub struct AppState {
    pub clips: Arc<RwLock<HashMap<String, AudioClip>>>,
    pub activities: Arc<RwLock<Vec<UserActivity>>>,
    pub last_served: Arc<RwLock<HashMap<String, String>>>,
    pub grading: GradingCfg,
}

impl AppState {
    /// Build state from env: load config, then catalog and seeds.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        Self::from_config(load_app_config_from_env())
    }

    pub fn from_config(cfg_opt: Option<AppConfig>) -> Self {
        let grading = cfg_opt
            .as_ref()
            .map(|c| c.grading.clone())
            .unwrap_or_default()
            .sanitized();

        let mut id_map = HashMap::<String, AudioClip>::new();
        let now = chrono::Utc::now();

        // Catalog clips first; they win over seeds with the same id.
        if let Some(cfg) = &cfg_opt {
            for cc in &cfg.clips {
                let id = cc
                    .id
                    .clone()
                    .unwrap_or_else(|| clip_id(&cc.folder_name, &cc.file_name));

                if let (Some(masked), Some(original)) = (&cc.miss_text, &cc.original_text) {
                    match check_alignment(masked, original) {
                        Ok(0) => {
                            error!(target: "practice", %id, "Skipping catalog clip: masked transcript has no blanks.");
                            continue;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(target: "practice", %id, error = %e, "Skipping catalog clip: transcripts do not align.");
                            continue;
                        }
                    }
                }

                let clip = AudioClip {
                    id: id.clone(),
                    text: cc.text.clone().or_else(|| cc.original_text.clone()),
                    audio_path: cc.audio_path.clone(),
                    file_size: cc.file_size,
                    folder_name: cc.folder_name.clone(),
                    file_name: cc.file_name.clone(),
                    miss_text: cc.miss_text.clone(),
                    chinese: cc.chinese.clone(),
                    original_text: cc.original_text.clone(),
                    created_at: now,
                    source: ClipSource::Catalog,
                };
                id_map.insert(id, clip);
            }
        }

        // Always insert built-in seeds, but don't overwrite existing ids.
        for c in seed_clips() {
            id_map.entry(c.id.clone()).or_insert(c);
        }

        // Inventory summary by source.
        let mut count_by_source: HashMap<ClipSource, (usize, usize)> = HashMap::new();
        for clip in id_map.values() {
            let entry = count_by_source.entry(clip.source).or_insert((0, 0));
            entry.0 += 1;
            if clip.is_practicable() {
                entry.1 += 1;
            }
        }
        for (source, (total, practicable)) in count_by_source {
            info!(target: "practice", ?source, total, practicable, "Startup clip inventory");
        }
        info!(target: "listening_backend", policy = ?grading.answer_policy, pass_threshold = grading.pass_threshold, "Grading settings");

        Self {
            clips: Arc::new(RwLock::new(id_map)),
            activities: Arc::new(RwLock::new(Vec::new())),
            last_served: Arc::new(RwLock::new(HashMap::new())),
            grading,
        }
    }

    /// Insert or replace a clip. Keeps `created_at` of a replaced clip.
    /// Returns true when the id was new.
    #[instrument(level = "debug", skip(self, c), fields(id = %c.id))]
    pub async fn upsert_clip(&self, mut c: AudioClip) -> bool {
        let mut clips = self.clips.write().await;
        match clips.get(&c.id) {
            Some(existing) => {
                c.created_at = existing.created_at;
                clips.insert(c.id.clone(), c);
                false
            }
            None => {
                clips.insert(c.id.clone(), c);
                true
            }
        }
    }

    /// Read-only access to a clip by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_clip(&self, id: &str) -> Option<AudioClip> {
        self.clips.read().await.get(id).cloned()
    }

    /// All clips, newest first.
    pub async fn list_clips(&self) -> Vec<AudioClip> {
        let mut all: Vec<AudioClip> = self.clips.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Selection policy:
    /// pick a random practicable clip, avoiding the one last served to this
    /// user when there is another to choose from.
    #[instrument(level = "info", skip(self))]
    pub async fn choose_test(&self, user_id: Option<&str>) -> Result<AudioClip, AppError> {
        let mut pool: Vec<AudioClip> = self
            .clips
            .read()
            .await
            .values()
            .filter(|c| c.is_practicable())
            .cloned()
            .collect();
        if pool.is_empty() {
            warn!(target: "practice", "No practicable clips in catalog");
            return Err(AppError::not_found("No tests available"));
        }

        // One guard covers the read and the update, so concurrent requests from
        // the same user see each other's picks.
        let mut served = match user_id {
            Some(uid) => Some((uid, self.last_served.write().await)),
            None => None,
        };
        if let Some((uid, seen)) = &served {
            if let Some(last_id) = seen.get(*uid) {
                if pool.len() > 1 {
                    pool.retain(|c| &c.id != last_id);
                }
            }
        }

        let chosen = match pool.choose(&mut rand::thread_rng()) {
            Some(c) => c.clone(),
            None => return Err(AppError::not_found("No tests available")),
        };

        if let Some((uid, seen)) = served.as_mut() {
            seen.insert(uid.to_string(), chosen.id.clone());
        }
        info!(target: "practice", id = %chosen.id, pool = pool.len(), "Test chosen");
        Ok(chosen)
    }

    #[instrument(level = "debug", skip(self, a), fields(id = %a.id, user = %a.user_id, audio = %a.audio_id))]
    pub async fn push_activity(&self, a: UserActivity) {
        self.activities.write().await.push(a);
    }

    /// One user's activities, newest first.
    pub async fn activities_for(&self, user_id: &str) -> Vec<UserActivity> {
        let mut mine: Vec<UserActivity> = self
            .activities
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClipCfg;

    fn cfg_clip(file: &str, masked: &str, original: &str) -> ClipCfg {
        ClipCfg {
            id: None,
            folder_name: "unit1".into(),
            file_name: file.into(),
            audio_path: format!("https://cdn.example.com/{}", file),
            file_size: 10,
            text: None,
            miss_text: Some(masked.into()),
            chinese: Some("中文".into()),
            original_text: Some(original.into()),
        }
    }

    #[tokio::test]
    async fn catalog_clips_are_loaded_and_misaligned_ones_skipped() {
        let cfg = AppConfig {
            grading: GradingCfg::default(),
            clips: vec![
                cfg_clip("ok.flac", "the *** fox", "the quick fox"),
                cfg_clip("bad.flac", "the *** fox", "the quick brown fox"),
                cfg_clip("noblank.flac", "the fox", "the fox"),
            ],
        };
        let state = AppState::from_config(Some(cfg));

        let ok = state.get_clip("unit1_ok.flac").await.unwrap();
        assert_eq!(ok.source, ClipSource::Catalog);
        assert_eq!(ok.text.as_deref(), Some("the quick fox"));
        assert!(state.get_clip("unit1_bad.flac").await.is_none());
        assert!(state.get_clip("unit1_noblank.flac").await.is_none());
        // seeds are always there
        assert!(state.list_clips().await.iter().any(|c| c.source == ClipSource::Seed));
    }

    #[tokio::test]
    async fn choose_test_avoids_last_served_clip() {
        let state = AppState::from_config(None);
        let first = state.choose_test(Some("u1")).await.unwrap();
        for _ in 0..10 {
            let next = state.choose_test(Some("u1")).await.unwrap();
            assert_ne!(next.id, first.id);
            let again = state.choose_test(Some("u1")).await.unwrap();
            assert_ne!(again.id, next.id);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_picks_for_one_user_do_not_repeat() {
        let state = Arc::new(AppState::from_config(None));
        for _ in 0..20 {
            let a = tokio::spawn({
                let state = state.clone();
                async move { state.choose_test(Some("u1")).await.unwrap().id }
            });
            let b = tokio::spawn({
                let state = state.clone();
                async move { state.choose_test(Some("u1")).await.unwrap().id }
            });
            let (a, b) = (a.await.unwrap(), b.await.unwrap());
            assert_ne!(a, b);
        }
    }

    #[tokio::test]
    async fn choose_test_without_practicable_clips() {
        let state = AppState::from_config(None);
        state.clips.write().await.values_mut().for_each(|c| c.chinese = None);
        let err = state.choose_test(None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn upsert_keeps_created_at() {
        let state = AppState::from_config(None);
        let mut clip = state.list_clips().await.remove(0);
        let created = clip.created_at;
        clip.created_at = created + chrono::Duration::days(1);
        clip.chinese = Some("新的".into());

        assert!(!state.upsert_clip(clip.clone()).await);
        let stored = state.get_clip(&clip.id).await.unwrap();
        assert_eq!(stored.created_at, created);
        assert_eq!(stored.chinese.as_deref(), Some("新的"));
    }
}
