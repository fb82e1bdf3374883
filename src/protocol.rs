//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cloze::AnswerPolicy;
use crate::domain::{AudioClip, ClipSource, UserActivity};
use crate::stats::UserStats;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewTest,
    SubmitAnswers {
        #[serde(rename = "audioId")]
        audio_id: String,
        answers: Vec<String>,
        #[serde(default, rename = "timeSpent")]
        time_spent: Option<u64>,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Test {
        test: TestOut,
    },
    GradeResult(SubmitOut),
    Error {
        message: String,
    },
}

/// Clip as served to a learner. The original transcript stays on the server
/// until the learner submits.
#[derive(Debug, Serialize)]
pub struct TestOut {
    pub id: String,
    pub audio_path: String,
    pub miss_text: String,
    pub chinese: String,
    pub blanks: usize,
}

/// Convert a practicable clip to the learner DTO.
pub fn to_test_out(c: &AudioClip) -> TestOut {
    let miss_text = c.miss_text.clone().unwrap_or_default();
    TestOut {
        id: c.id.clone(),
        audio_path: c.audio_path.clone(),
        blanks: crate::cloze::blank_count(&crate::cloze::tokenize(&miss_text)),
        miss_text,
        chinese: c.chinese.clone().unwrap_or_default(),
    }
}

/// Full clip record for the admin views.
#[derive(Debug, Serialize)]
pub struct ClipOut {
    pub id: String,
    pub text: Option<String>,
    pub audio_path: String,
    pub file_size: u64,
    pub folder_name: String,
    pub file_name: String,
    pub miss_text: Option<String>,
    pub chinese: Option<String>,
    pub original_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub source: ClipSource,
}

pub fn to_clip_out(c: &AudioClip) -> ClipOut {
    ClipOut {
        id: c.id.clone(),
        text: c.text.clone(),
        audio_path: c.audio_path.clone(),
        file_size: c.file_size,
        folder_name: c.folder_name.clone(),
        file_name: c.file_name.clone(),
        miss_text: c.miss_text.clone(),
        chinese: c.chinese.clone(),
        original_text: c.original_text.clone(),
        created_at: c.created_at,
        source: c.source,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeIn {
    pub masked_text: String,
    pub original_text: String,
    pub answers: Vec<String>,
    #[serde(default)]
    pub policy: Option<AnswerPolicy>,
}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOut {
    pub success: bool,
    pub results: Vec<bool>,
    pub correct_count: usize,
    pub total: usize,
    pub percent: f32,
    pub passed: bool,
}

#[derive(Debug, Serialize)]
pub struct RandomTestOut {
    pub success: bool,
    pub test: TestOut,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitIn {
    pub answers: Vec<String>,
    #[serde(default)]
    pub time_spent: Option<u64>,
}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOut {
    pub success: bool,
    pub audio_id: String,
    pub results: Vec<bool>,
    pub correct_count: usize,
    pub total: usize,
    pub percent: f32,
    /// Every blank correct.
    pub passed: bool,
    /// Score reached the configured pass threshold; this is what the activity log records.
    pub is_correct: bool,
    /// Original words at each blank, in blank order.
    pub expected: Vec<String>,
    pub original_text: String,
    pub activity_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityIn {
    pub audio_id: String,
    pub is_correct: bool,
    #[serde(default)]
    pub user_answer: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_spent: Option<u64>,
}
#[derive(Debug, Serialize)]
pub struct ActivityOut {
    pub success: bool,
    pub message: String,
    pub activity: UserActivity,
}

#[derive(Debug, Deserialize, Default)]
pub struct ActivitiesQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Clip fields joined onto an activity in listings.
#[derive(Debug, Serialize)]
pub struct ActivityAudio {
    pub id: String,
    pub file_name: String,
    pub folder_name: String,
    pub miss_text: Option<String>,
    pub original_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityView {
    #[serde(flatten)]
    pub activity: UserActivity,
    pub audio: Option<ActivityAudio>,
}

#[derive(Debug, Serialize)]
pub struct ActivityListOut {
    pub success: bool,
    pub activities: Vec<ActivityView>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsOut {
    pub success: bool,
    pub stats: UserStats,
}

#[derive(Debug, Serialize)]
pub struct ClipListOut {
    pub success: bool,
    pub files: Vec<ClipOut>,
}

/// Admin registration of a clip already uploaded to external storage.
#[derive(Debug, Deserialize)]
pub struct ClipUpsertIn {
    #[serde(default)]
    pub id: Option<String>,
    pub folder_name: String,
    pub file_name: String,
    pub audio_path: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub miss_text: Option<String>,
    #[serde(default)]
    pub chinese: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct ClipUpsertOut {
    pub success: bool,
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ClipUpdateIn {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub miss_text: Option<String>,
    #[serde(default)]
    pub chinese: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageOut {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
