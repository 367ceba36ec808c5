use std::collections::BTreeMap;

use serde_json::Value;

use super::models::{CanvasAccount, CanvasCourse, CanvasSyncResponse};
use crate::models::connection::AccountInfo;
use crate::models::container::Container;

/// Maps Canvas payloads onto the provider-neutral models.
pub struct CanvasMapper;

impl CanvasMapper {
    pub fn account(account: CanvasAccount) -> AccountInfo {
        let name = [account.name, account.user_name]
            .into_iter()
            .flatten()
            .map(|n| n.trim().to_string())
            .find(|n| !n.is_empty())
            .unwrap_or_else(|| "Canvas".to_string());
        AccountInfo {
            name,
            resource_count: account.course_count,
            rate_limit_remaining: account.rate_limit_remaining,
        }
    }

    pub fn containers(courses: Vec<CanvasCourse>) -> Vec<Container> {
        courses.into_iter().map(Self::container).collect()
    }

    fn container(course: CanvasCourse) -> Container {
        let mut metadata = BTreeMap::new();
        if let Some(code) = course.course_code {
            metadata.insert("courseCode".to_string(), Value::String(code));
        }
        if let Some(term) = course.term {
            // Canvas reports the term either as a name or as an object with one.
            let term = if term.is_object() {
                term.get("name").cloned().unwrap_or(term)
            } else {
                term
            };
            metadata.insert("term".to_string(), term);
        }
        if let Some(state) = course.workflow_state {
            metadata.insert("workflowState".to_string(), Value::String(state));
        }

        Container {
            id: course.id,
            display_name: course.name.trim().to_string(),
            member_count: course.total_students,
            metadata,
        }
    }

    /// Canvas-specific fields that go under `sourceMetadata`.
    pub fn source_metadata(response: &CanvasSyncResponse) -> BTreeMap<String, Value> {
        let mut metadata = BTreeMap::new();
        if let Some(ref name) = response.course_name {
            metadata.insert("courseName".to_string(), Value::from(name.as_str()));
        }
        if let Some(n) = response.assignments_analyzed {
            metadata.insert("assignmentsAnalyzed".to_string(), Value::from(n));
        }
        if let Some(n) = response.submissions_analyzed {
            metadata.insert("submissionsAnalyzed".to_string(), Value::from(n));
        }
        metadata
    }
}
