use serde::Deserialize;
use serde_json::Value;

use crate::providers::{deserialize_id, RawSyncEnvelope};

/// Body of a successful `/api/canvas/connect` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    #[serde(alias = "account_info")]
    pub account_info: Option<CanvasAccount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasAccount {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "user_name")]
    pub user_name: Option<String>,
    #[serde(default, alias = "coursesCount", alias = "courses_count")]
    pub course_count: u32,
    #[serde(default, alias = "rate_limit_remaining")]
    pub rate_limit_remaining: Option<u32>,
}

/// Wrapper for the courses endpoint response.
#[derive(Debug, Deserialize)]
pub struct CoursesResponse {
    #[serde(default)]
    pub courses: Option<Vec<CanvasCourse>>,
    #[serde(default)]
    pub containers: Option<Vec<CanvasCourse>>,
}

impl CoursesResponse {
    /// The course list, preferring `courses` over the generic `containers` key.
    pub fn into_courses(self) -> Option<Vec<CanvasCourse>> {
        self.courses.or(self.containers)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasCourse {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "course_code")]
    pub course_code: Option<String>,
    #[serde(default, alias = "total_students", alias = "studentCount")]
    pub total_students: u32,
    #[serde(default)]
    pub term: Option<Value>,
    #[serde(default, alias = "workflow_state")]
    pub workflow_state: Option<String>,
}

/// Raw `/api/canvas/sync` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSyncResponse {
    #[serde(flatten)]
    pub envelope: RawSyncEnvelope,
    #[serde(default, alias = "course_name")]
    pub course_name: Option<String>,
    #[serde(default, alias = "assignments_analyzed")]
    pub assignments_analyzed: Option<u32>,
    #[serde(default, alias = "submissions_analyzed")]
    pub submissions_analyzed: Option<u32>,
}
