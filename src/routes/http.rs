//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs ids and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::logic::*;
use crate::protocol::*;
use crate::routes::extract::{ApiJson, ApiQuery};
use crate::routes::identity::{Admin, MaybeUser, User};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(answers = body.answers.len()))]
pub async fn http_post_grade(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<GradeIn>,
) -> Result<Json<GradeOut>, AppError> {
  let result = grade_raw(&state, &body)?;
  Ok(Json(grade_out(&result)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_random_test(
  State(state): State<Arc<AppState>>,
  MaybeUser(user): MaybeUser,
) -> Result<Json<RandomTestOut>, AppError> {
  let clip = state.choose_test(user.as_deref()).await?;
  info!(target: "practice", id = %clip.id, "HTTP test served");
  Ok(Json(RandomTestOut { success: true, test: to_test_out(&clip) }))
}

#[instrument(level = "info", skip(state, body), fields(%audio_id, answers = body.answers.len()))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  MaybeUser(user): MaybeUser,
  Path(audio_id): Path<String>,
  ApiJson(body): ApiJson<SubmitIn>,
) -> Result<Json<SubmitOut>, AppError> {
  let out = submit_answers(&state, user.as_deref(), &audio_id, &body.answers, body.time_spent).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%user_id, audio = %body.audio_id))]
pub async fn http_post_activity(
  State(state): State<Arc<AppState>>,
  User(user_id): User,
  ApiJson(body): ApiJson<ActivityIn>,
) -> Result<Json<ActivityOut>, AppError> {
  let activity = create_activity(&state, &user_id, body).await?;
  info!(target: "practice", id = %activity.id, "Activity recorded");
  Ok(Json(ActivityOut { success: true, message: "Activity recorded".into(), activity }))
}

#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn http_get_activities(
  State(state): State<Arc<AppState>>,
  User(user_id): User,
  ApiQuery(q): ApiQuery<ActivitiesQuery>,
) -> Json<ActivityListOut> {
  Json(list_activities(&state, &user_id, &q).await)
}

#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn http_get_stats(
  State(state): State<Arc<AppState>>,
  User(user_id): User,
) -> Json<StatsOut> {
  let stats = user_stats(&state, &user_id).await;
  Json(StatsOut { success: true, stats })
}

#[instrument(level = "info", skip(state), fields(%admin))]
pub async fn http_admin_list_audio(
  State(state): State<Arc<AppState>>,
  Admin(admin): Admin,
) -> Json<ClipListOut> {
  let files = state.list_clips().await.iter().map(to_clip_out).collect();
  Json(ClipListOut { success: true, files })
}

#[instrument(level = "info", skip(state, body), fields(%admin))]
pub async fn http_admin_upsert_audio(
  State(state): State<Arc<AppState>>,
  Admin(admin): Admin,
  ApiJson(body): ApiJson<ClipUpsertIn>,
) -> Result<Json<ClipUpsertOut>, AppError> {
  let clip = upsert_clip(&state, body).await?;
  Ok(Json(ClipUpsertOut { success: true, id: clip.id, url: clip.audio_path }))
}

#[instrument(level = "info", skip(state, body), fields(%admin, id = %body.id))]
pub async fn http_admin_update_audio(
  State(state): State<Arc<AppState>>,
  Admin(admin): Admin,
  ApiJson(body): ApiJson<ClipUpdateIn>,
) -> Result<Json<MessageOut>, AppError> {
  update_clip(&state, body).await?;
  Ok(Json(MessageOut { success: true, message: "Audio updated".into() }))
}
