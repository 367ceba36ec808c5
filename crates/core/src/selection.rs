//! Container list and single-selection state for one provider.

use crate::error::{PathwayError, Result};
use crate::models::container::{Container, Selection};
use crate::models::provider::ProviderId;

/// What a call to [`ContainerSelector::select`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// The container was already selected; nothing changed.
    Unchanged(Selection),
    /// A different container is now selected.
    Changed(Selection),
}

impl SelectOutcome {
    pub fn selection(&self) -> &Selection {
        match self {
            SelectOutcome::Unchanged(s) | SelectOutcome::Changed(s) => s,
        }
    }

    pub fn into_selection(self) -> Selection {
        match self {
            SelectOutcome::Unchanged(s) | SelectOutcome::Changed(s) => s,
        }
    }
}

#[derive(Debug, Default)]
pub struct ContainerSelector {
    containers: Vec<Container>,
    selected: Option<Selection>,
}

impl ContainerSelector {
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn selected(&self) -> Option<&Selection> {
        self.selected.as_ref()
    }

    /// Replace the whole container set. A selection whose container is gone is
    /// dropped; returns true in that case.
    pub fn replace(&mut self, containers: Vec<Container>) -> bool {
        self.containers = containers;

        let Some(current) = self.selected.take() else {
            return false;
        };
        match self
            .containers
            .iter()
            .find(|c| c.id == current.container.id)
        {
            Some(fresh) => {
                self.selected = Some(Selection {
                    provider: current.provider,
                    container: fresh.clone(),
                });
                false
            }
            None => true,
        }
    }

    pub fn select(&mut self, provider: ProviderId, container_id: &str) -> Result<SelectOutcome> {
        if let Some(current) = &self.selected {
            if current.container.id == container_id {
                return Ok(SelectOutcome::Unchanged(current.clone()));
            }
        }

        let container = self
            .containers
            .iter()
            .find(|c| c.id == container_id)
            .cloned()
            .ok_or_else(|| PathwayError::UnknownContainer {
                provider,
                container_id: container_id.to_string(),
            })?;

        let selection = Selection {
            provider,
            container,
        };
        self.selected = Some(selection.clone());
        Ok(SelectOutcome::Changed(selection))
    }

    pub fn clear(&mut self) {
        self.containers.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn container(id: &str, name: &str) -> Container {
        Container {
            id: id.into(),
            display_name: name.into(),
            member_count: 20,
            metadata: BTreeMap::new(),
        }
    }

    fn selector() -> ContainerSelector {
        let mut selector = ContainerSelector::default();
        selector.replace(vec![container("1", "Algebra"), container("2", "Biology")]);
        selector
    }

    #[test]
    fn select_known_container() {
        let mut selector = selector();
        let outcome = selector.select(ProviderId::Canvas, "2").unwrap();
        assert!(matches!(outcome, SelectOutcome::Changed(_)));
        assert_eq!(outcome.selection().container.display_name, "Biology");
        assert_eq!(selector.selected().unwrap().container_id(), "2");
    }

    #[test]
    fn select_unknown_container_fails() {
        let mut selector = selector();
        let err = selector.select(ProviderId::Canvas, "9").unwrap_err();
        assert!(matches!(
            err,
            PathwayError::UnknownContainer { ref container_id, .. } if container_id == "9"
        ));
        assert!(selector.selected().is_none());
    }

    #[test]
    fn reselecting_same_container_is_unchanged() {
        let mut selector = selector();
        let first = selector.select(ProviderId::Canvas, "1").unwrap();
        let second = selector.select(ProviderId::Canvas, "1").unwrap();
        assert!(matches!(second, SelectOutcome::Unchanged(_)));
        assert_eq!(first.selection(), second.selection());
    }

    #[test]
    fn replace_keeps_selection_when_container_survives() {
        let mut selector = selector();
        selector.select(ProviderId::Canvas, "2").unwrap();

        let dropped = selector.replace(vec![container("2", "Biology (renamed)")]);
        assert!(!dropped);
        assert_eq!(
            selector.selected().unwrap().container.display_name,
            "Biology (renamed)"
        );
    }

    #[test]
    fn replace_drops_selection_when_container_vanishes() {
        let mut selector = selector();
        selector.select(ProviderId::Canvas, "2").unwrap();

        let dropped = selector.replace(vec![container("3", "Chemistry")]);
        assert!(dropped);
        assert!(selector.selected().is_none());
        assert_eq!(selector.containers().len(), 1);
    }

    #[test]
    fn clear_discards_everything() {
        let mut selector = selector();
        selector.select(ProviderId::Canvas, "1").unwrap();
        selector.clear();
        assert!(selector.containers().is_empty());
        assert!(selector.selected().is_none());
    }
}
