use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::provider::ProviderId;

/// A selectable unit inside a provider: a course or a school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub display_name: String,
    pub member_count: u32,
    /// Provider-specific details (course code, grade levels, section).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// The container currently selected for a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub provider: ProviderId,
    pub container: Container,
}

impl Selection {
    pub fn container_id(&self) -> &str {
        &self.container.id
    }
}
