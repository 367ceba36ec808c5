use std::collections::BTreeMap;

use serde_json::Value;

use super::models::{PowerSchoolDistrict, PowerSchoolSchool, PowerSchoolSyncResponse};
use crate::models::connection::AccountInfo;
use crate::models::container::Container;

/// Maps PowerSchool payloads onto the provider-neutral models.
pub struct PowerSchoolMapper;

impl PowerSchoolMapper {
    pub fn account(district: PowerSchoolDistrict) -> AccountInfo {
        let name = [district.district_name, district.name]
            .into_iter()
            .flatten()
            .map(|n| n.trim().to_string())
            .find(|n| !n.is_empty())
            .unwrap_or_else(|| "PowerSchool".to_string());
        AccountInfo {
            name,
            resource_count: district.school_count,
            rate_limit_remaining: district.rate_limit_remaining,
        }
    }

    pub fn containers(schools: Vec<PowerSchoolSchool>) -> Vec<Container> {
        schools.into_iter().map(Self::container).collect()
    }

    fn container(school: PowerSchoolSchool) -> Container {
        let mut metadata = BTreeMap::new();
        if !school.grade_levels.is_empty() {
            let levels = grade_labels(&school.grade_levels)
                .into_iter()
                .map(Value::String)
                .collect();
            metadata.insert("gradeLevels".to_string(), Value::Array(levels));
        }
        if let Some(number) = school.school_number {
            metadata.insert("schoolNumber".to_string(), number);
        }

        Container {
            id: school.id,
            display_name: school.name.trim().to_string(),
            member_count: school.student_count,
            metadata,
        }
    }

    /// PowerSchool-specific fields that go under `sourceMetadata`.
    pub fn source_metadata(response: &PowerSchoolSyncResponse) -> BTreeMap<String, Value> {
        let mut metadata = BTreeMap::new();
        if let Some(ref name) = response.school_name {
            metadata.insert("schoolName".to_string(), Value::from(name.as_str()));
        }
        if let Some(n) = response.attendance_coverage {
            metadata.insert("attendanceCoverage".to_string(), Value::from(n));
        }
        if let Some(n) = response.discipline_coverage {
            metadata.insert("disciplineCoverage".to_string(), Value::from(n));
        }
        if let Some(ref levels) = response.grade_levels {
            let levels = grade_labels(levels).into_iter().map(Value::String).collect();
            metadata.insert("gradeLevels".to_string(), Value::Array(levels));
        }
        metadata
    }
}

/// Render grade levels as trimmed labels, dropping entries that are neither strings nor numbers.
fn grade_labels(levels: &[Value]) -> Vec<String> {
    levels
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}
