use serde::Deserialize;

use crate::providers::{deserialize_id, RawSyncEnvelope};

/// Step one of the OAuth flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStartResponse {
    #[serde(default, alias = "authorization_url", alias = "authUrl")]
    pub authorization_url: Option<String>,
    /// Issued directly by the backend when running the demo flow.
    #[serde(default, alias = "authorization_code", alias = "demoCode")]
    pub authorization_code: Option<String>,
}

/// Step two of the OAuth flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCompleteResponse {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default, alias = "account_info")]
    pub account_info: Option<ClassroomProfile>,
    #[serde(default)]
    pub profile: Option<ClassroomProfile>,
}

impl AuthCompleteResponse {
    /// The signed-in profile, preferring `accountInfo` over `profile`.
    pub fn into_profile(self) -> Option<ClassroomProfile> {
        self.account_info.or(self.profile)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "email_address")]
    pub email_address: Option<String>,
    #[serde(default, alias = "course_count", alias = "coursesCount")]
    pub course_count: u32,
}

/// Wrapper for the courses endpoint response.
#[derive(Debug, Deserialize)]
pub struct CoursesResponse {
    #[serde(default)]
    pub courses: Option<Vec<ClassroomCourse>>,
    #[serde(default)]
    pub containers: Option<Vec<ClassroomCourse>>,
}

impl CoursesResponse {
    /// The course list, preferring `courses` over the generic `containers` key.
    pub fn into_courses(self) -> Option<Vec<ClassroomCourse>> {
        self.courses.or(self.containers)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomCourse {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default, alias = "studentCount", alias = "enrollment_count")]
    pub enrollment_count: u32,
    #[serde(default, alias = "course_state")]
    pub course_state: Option<String>,
}

/// Raw `/api/google-classroom/sync` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomSyncResponse {
    #[serde(flatten)]
    pub envelope: RawSyncEnvelope,
    #[serde(default, alias = "course_name")]
    pub course_name: Option<String>,
    #[serde(default, alias = "coursework_analyzed", alias = "courseWorkAnalyzed")]
    pub coursework_analyzed: Option<u32>,
    #[serde(default, alias = "submissions_analyzed")]
    pub submissions_analyzed: Option<u32>,
}
