use std::collections::BTreeMap;

use serde_json::Value;

use super::models::{ClassroomCourse, ClassroomProfile, ClassroomSyncResponse};
use crate::models::connection::AccountInfo;
use crate::models::container::Container;

/// Maps Google Classroom payloads onto the provider-neutral models.
pub struct ClassroomMapper;

impl ClassroomMapper {
    pub fn account(profile: Option<ClassroomProfile>) -> AccountInfo {
        let (names, course_count) = match profile {
            Some(p) => ([p.name, p.email, p.email_address], p.course_count),
            None => ([None, None, None], 0),
        };
        AccountInfo {
            name: names
                .into_iter()
                .flatten()
                .map(|n| n.trim().to_string())
                .find(|n| !n.is_empty())
                .unwrap_or_else(|| "Google Classroom".to_string()),
            resource_count: course_count,
            rate_limit_remaining: None,
        }
    }

    pub fn containers(courses: Vec<ClassroomCourse>) -> Vec<Container> {
        courses.into_iter().map(Self::container).collect()
    }

    fn container(course: ClassroomCourse) -> Container {
        let mut metadata = BTreeMap::new();
        if let Some(section) = course.section {
            metadata.insert("section".to_string(), Value::String(section));
        }
        if let Some(room) = course.room {
            metadata.insert("room".to_string(), Value::String(room));
        }
        if let Some(state) = course.course_state {
            metadata.insert("courseState".to_string(), Value::String(state));
        }

        Container {
            id: course.id,
            display_name: course.name.trim().to_string(),
            member_count: course.enrollment_count,
            metadata,
        }
    }

    /// Classroom-specific fields that go under `sourceMetadata`.
    pub fn source_metadata(response: &ClassroomSyncResponse) -> BTreeMap<String, Value> {
        let mut metadata = BTreeMap::new();
        if let Some(ref name) = response.course_name {
            metadata.insert("courseName".to_string(), Value::from(name.as_str()));
        }
        if let Some(n) = response.coursework_analyzed {
            metadata.insert("courseworkAnalyzed".to_string(), Value::from(n));
        }
        if let Some(n) = response.submissions_analyzed {
            metadata.insert("submissionsAnalyzed".to_string(), Value::from(n));
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_without_profile_uses_product_name() {
        let info = ClassroomMapper::account(None);
        assert_eq!(info.name, "Google Classroom");
        assert_eq!(info.resource_count, 0);
    }

    #[test]
    fn account_with_profile() {
        let info = ClassroomMapper::account(Some(ClassroomProfile {
            name: Some("Ada Lovelace".into()),
            email: Some("ada@example.edu".into()),
            email_address: None,
            course_count: 5,
        }));
        assert_eq!(info.name, "Ada Lovelace");
        assert_eq!(info.resource_count, 5);
    }

    #[test]
    fn account_falls_back_to_email() {
        let info = ClassroomMapper::account(Some(ClassroomProfile {
            name: None,
            email: None,
            email_address: Some("teacher@school.edu".into()),
            course_count: 1,
        }));
        assert_eq!(info.name, "teacher@school.edu");
    }

    #[test]
    fn container_keeps_section_and_room() {
        let course: ClassroomCourse = serde_json::from_value(serde_json::json!({
            "id": "c1", "name": "Art", "section": "B", "room": "114", "enrollmentCount": 19
        }))
        .unwrap();
        let containers = ClassroomMapper::containers(vec![course]);
        assert_eq!(containers[0].metadata["section"], "B");
        assert_eq!(containers[0].metadata["room"], "114");
        assert_eq!(containers[0].member_count, 19);
    }
}
