//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Grading raw transcripts and submissions against stored clips
//!   - Recording and listing user activities, and per-user stats
//!   - Admin upsert/update of clip metadata with transcript validation

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cloze::{self, check_alignment, GradeResult, PLACEHOLDER};
use crate::domain::{clip_id, AudioClip, ClipSource, UserActivity};
use crate::error::{AppError, ValidationError};
use crate::protocol::*;
use crate::state::AppState;
use crate::stats::{self, UserStats};

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 200;

/// Grade two raw transcripts. The request may override the configured policy.
#[instrument(level = "info", skip(state, body), fields(answers = body.answers.len()))]
pub fn grade_raw(state: &AppState, body: &GradeIn) -> Result<GradeResult, AppError> {
  let policy = body.policy.unwrap_or(state.grading.answer_policy);
  let result = cloze::grade_text(&body.masked_text, &body.original_text, &body.answers, policy)?;
  debug!(target: "practice", blanks = result.len(), correct = result.correct_count(), "Raw transcripts graded");
  Ok(result)
}

pub fn grade_out(result: &GradeResult) -> GradeOut {
  GradeOut {
    success: true,
    results: result.results().to_vec(),
    correct_count: result.correct_count(),
    total: result.len(),
    percent: result.percent(),
    passed: result.passed(),
  }
}

/// Original words sitting under the blanks of `masked`, in blank order.
fn expected_words(masked: &str, original: &str) -> Vec<String> {
  cloze::tokenize(masked)
    .into_iter()
    .zip(cloze::tokenize(original))
    .filter(|(m, _)| *m == PLACEHOLDER)
    .map(|(_, o)| o.to_string())
    .collect()
}

/// Grade a learner's answers against a stored clip and, when the learner is
/// known, log the attempt.
#[instrument(level = "info", skip(state, answers), fields(%audio_id, answers = answers.len()))]
pub async fn submit_answers(
  state: &AppState,
  user_id: Option<&str>,
  audio_id: &str,
  answers: &[String],
  time_spent: Option<u64>,
) -> Result<SubmitOut, AppError> {
  let clip = state
    .get_clip(audio_id)
    .await
    .ok_or_else(|| AppError::not_found(format!("Unknown audio id: {}", audio_id)))?;
  let (masked, original) = match (&clip.miss_text, &clip.original_text) {
    (Some(m), Some(o)) => (m.as_str(), o.as_str()),
    _ => return Err(AppError::not_found(format!("Audio {} has no practice text", audio_id))),
  };

  let result = cloze::grade_text(masked, original, answers, state.grading.answer_policy)?;
  let is_correct = result.score() >= state.grading.pass_threshold;

  let activity_id = match user_id {
    Some(uid) => {
      let now = Utc::now();
      let activity = UserActivity {
        id: Uuid::new_v4().to_string(),
        user_id: uid.to_string(),
        audio_id: clip.id.clone(),
        is_correct,
        user_answer: Some(answers.join(" ")),
        correct_answer: Some(original.to_string()),
        completed_at: Some(now),
        time_spent,
        created_at: now,
      };
      let id = activity.id.clone();
      state.push_activity(activity).await;
      Some(id)
    }
    None => None,
  };

  info!(target: "practice", id = %clip.id, correct = result.correct_count(), total = result.len(), passed = result.passed(), is_correct, logged = activity_id.is_some(), "Submission graded");
  Ok(SubmitOut {
    success: true,
    audio_id: clip.id.clone(),
    results: result.results().to_vec(),
    correct_count: result.correct_count(),
    total: result.len(),
    percent: result.percent(),
    passed: result.passed(),
    is_correct,
    expected: expected_words(masked, original),
    original_text: original.to_string(),
    activity_id,
  })
}

/// Transcripts must line up and carry at least one blank before they are stored.
fn validate_texts(miss_text: Option<&str>, original_text: Option<&str>) -> Result<(), ValidationError> {
  if let (Some(masked), Some(original)) = (miss_text, original_text) {
    match check_alignment(masked, original) {
      Ok(0) => return Err(ValidationError::new("miss_text has no blanks (***)")),
      Ok(_) => {}
      Err(e) => return Err(ValidationError::new(e.to_string())),
    }
  }
  Ok(())
}

#[instrument(level = "info", skip(state, body), fields(folder = %body.folder_name, file = %body.file_name))]
pub async fn upsert_clip(state: &AppState, body: ClipUpsertIn) -> Result<AudioClip, AppError> {
  if body.folder_name.trim().is_empty() || body.file_name.trim().is_empty() {
    return Err(ValidationError::new("folder_name and file_name are required").into());
  }
  if body.audio_path.trim().is_empty() {
    return Err(ValidationError::new("audio_path is required").into());
  }
  validate_texts(body.miss_text.as_deref(), body.original_text.as_deref())?;

  let id = body
    .id
    .filter(|s| !s.trim().is_empty())
    .unwrap_or_else(|| clip_id(&body.folder_name, &body.file_name));
  let clip = AudioClip {
    id,
    text: body.text.or_else(|| body.original_text.clone()),
    audio_path: body.audio_path,
    file_size: body.file_size,
    folder_name: body.folder_name,
    file_name: body.file_name,
    miss_text: body.miss_text,
    chinese: body.chinese,
    original_text: body.original_text,
    created_at: Utc::now(),
    source: ClipSource::Admin,
  };
  let created = state.upsert_clip(clip.clone()).await;
  info!(target: "practice", id = %clip.id, created, "Clip registered");
  Ok(clip)
}

/// Patch the text fields of an existing clip.
#[instrument(level = "info", skip(state, body), fields(id = %body.id))]
pub async fn update_clip(state: &AppState, body: ClipUpdateIn) -> Result<AudioClip, AppError> {
  if body.id.trim().is_empty() {
    return Err(ValidationError::new("Audio id is required").into());
  }
  if body.miss_text.is_none() && body.chinese.is_none() && body.original_text.is_none() {
    return Err(ValidationError::new("No fields to update").into());
  }

  let mut clips = state.clips.write().await;
  let clip = clips
    .get_mut(&body.id)
    .ok_or_else(|| AppError::not_found(format!("Audio {} does not exist", body.id)))?;

  let miss_text = body.miss_text.or_else(|| clip.miss_text.clone());
  let original_text = body.original_text.or_else(|| clip.original_text.clone());
  validate_texts(miss_text.as_deref(), original_text.as_deref())?;

  clip.miss_text = miss_text;
  clip.original_text = original_text;
  if body.chinese.is_some() {
    clip.chinese = body.chinese;
  }
  info!(target: "practice", id = %clip.id, practicable = clip.is_practicable(), "Clip updated");
  Ok(clip.clone())
}

#[instrument(level = "info", skip(state, body), fields(%user_id, audio = %body.audio_id))]
pub async fn create_activity(state: &AppState, user_id: &str, body: ActivityIn) -> Result<UserActivity, AppError> {
  if body.audio_id.trim().is_empty() {
    return Err(ValidationError::new("audioId is required").into());
  }
  if state.get_clip(&body.audio_id).await.is_none() {
    return Err(AppError::not_found(format!("Audio {} does not exist", body.audio_id)));
  }
  let activity = UserActivity {
    id: Uuid::new_v4().to_string(),
    user_id: user_id.to_string(),
    audio_id: body.audio_id,
    is_correct: body.is_correct,
    user_answer: body.user_answer,
    correct_answer: body.correct_answer,
    completed_at: body.completed_at,
    time_spent: body.time_spent,
    created_at: Utc::now(),
  };
  state.push_activity(activity.clone()).await;
  Ok(activity)
}

/// A page of the user's activities (newest first), joined with clip info, plus the total.
#[instrument(level = "info", skip(state, q), fields(%user_id))]
pub async fn list_activities(state: &AppState, user_id: &str, q: &ActivitiesQuery) -> ActivityListOut {
  let limit = q.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
  let offset = q.offset.unwrap_or(0);

  let mine = state.activities_for(user_id).await;
  let total = mine.len();
  let clips = state.clips.read().await;
  let activities = mine
    .into_iter()
    .skip(offset)
    .take(limit)
    .map(|activity| {
      let audio = clips.get(&activity.audio_id).map(|c| ActivityAudio {
        id: c.id.clone(),
        file_name: c.file_name.clone(),
        folder_name: c.folder_name.clone(),
        miss_text: c.miss_text.clone(),
        original_text: c.original_text.clone(),
      });
      ActivityView { activity, audio }
    })
    .collect();

  ActivityListOut { success: true, activities, total, limit, offset }
}

#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn user_stats(state: &AppState, user_id: &str) -> UserStats {
  let mine = state.activities_for(user_id).await;
  let clips = state.clips.read().await;
  stats::compute(user_id, &mine, &clips, Utc::now())
}
