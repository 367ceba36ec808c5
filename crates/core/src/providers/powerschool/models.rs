use serde::Deserialize;
use serde_json::Value;

use crate::providers::{deserialize_id, RawSyncEnvelope};

/// Step one of the client-credentials handshake.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "token_type")]
    pub token_type: Option<String>,
    #[serde(default, alias = "expires_in")]
    pub expires_in: Option<u64>,
}

/// Step two: district details for the issued token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    #[serde(default, alias = "account_info")]
    pub account_info: Option<PowerSchoolDistrict>,
    #[serde(default)]
    pub district: Option<PowerSchoolDistrict>,
}

impl ConnectResponse {
    /// District details, preferring `accountInfo` over `district`.
    pub fn into_district(self) -> Option<PowerSchoolDistrict> {
        self.account_info.or(self.district)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSchoolDistrict {
    #[serde(default, alias = "district_name")]
    pub district_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "school_count", alias = "schoolsCount")]
    pub school_count: u32,
    #[serde(default, alias = "rate_limit_remaining")]
    pub rate_limit_remaining: Option<u32>,
}

/// Wrapper for the schools endpoint response.
#[derive(Debug, Deserialize)]
pub struct SchoolsResponse {
    #[serde(default)]
    pub schools: Option<Vec<PowerSchoolSchool>>,
    #[serde(default)]
    pub containers: Option<Vec<PowerSchoolSchool>>,
}

impl SchoolsResponse {
    /// The school list, preferring `schools` over the generic `containers` key.
    pub fn into_schools(self) -> Option<Vec<PowerSchoolSchool>> {
        self.schools.or(self.containers)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSchoolSchool {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "student_count", alias = "enrollment")]
    pub student_count: u32,
    /// Grade levels offered, as numbers ("9") or labels ("K").
    #[serde(default, alias = "grade_levels")]
    pub grade_levels: Vec<Value>,
    #[serde(default, alias = "school_number")]
    pub school_number: Option<Value>,
}

/// Raw `/api/powerschool/sync` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSchoolSyncResponse {
    #[serde(flatten)]
    pub envelope: RawSyncEnvelope,
    #[serde(default, alias = "school_name")]
    pub school_name: Option<String>,
    /// Students with attendance data available.
    #[serde(default, alias = "attendance_coverage")]
    pub attendance_coverage: Option<u32>,
    /// Students with discipline data available.
    #[serde(default, alias = "discipline_coverage")]
    pub discipline_coverage: Option<u32>,
    #[serde(default, alias = "grade_levels")]
    pub grade_levels: Option<Vec<Value>>,
}
