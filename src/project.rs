//! Storage of named cutting projects.
//!
//! The optimizer never touches this module. The application layer saves the
//! payload (request list, material, chosen pattern) after a run; the
//! repository assigns identity and timestamps.

use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{CutPattern, CutRequest, Material};

/// Errors raised by a project repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Project name must not be empty")]
    EmptyName,
    #[error("Project store is unavailable: {0}")]
    Unavailable(String),
}

/// Payload handed to the repository by the application layer.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NewProject {
    pub name: String,
    /// Opaque identifier of the owner; never interpreted by the store.
    pub owner_id: String,
    pub cuts: Vec<CutRequest>,
    pub material: Material,
    pub pattern: CutPattern,
}

/// A stored project with repository-assigned identity.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SavedProject {
    pub id: String,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    #[serde(flatten)]
    pub project: NewProject,
}

/// Durable store for projects.
pub trait ProjectRepository: Send + Sync {
    /// Stores a project and returns it with its assigned id.
    fn save(&self, project: NewProject) -> Result<SavedProject, RepositoryError>;

    /// Lists stored projects, optionally only those of one owner, oldest first.
    fn list(&self, owner_id: Option<&str>) -> Result<Vec<SavedProject>, RepositoryError>;
}

#[derive(Default)]
struct StoreState {
    next_id: u64,
    projects: Vec<SavedProject>,
}

/// Process-local repository, suitable for tests and single-instance deployments.
#[derive(Default)]
pub struct InMemoryProjectRepository {
    state: RwLock<StoreState>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectRepository for InMemoryProjectRepository {
    fn save(&self, project: NewProject) -> Result<SavedProject, RepositoryError> {
        if project.name.trim().is_empty() {
            return Err(RepositoryError::EmptyName);
        }

        let mut state = self
            .state
            .write()
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        state.next_id += 1;

        let saved = SavedProject {
            id: format!("project-{}", state.next_id),
            created_at: unix_now(),
            project,
        };
        state.projects.push(saved.clone());
        log::debug!("Saved project {} ({})", saved.id, saved.project.name);
        Ok(saved)
    }

    fn list(&self, owner_id: Option<&str>) -> Result<Vec<SavedProject>, RepositoryError> {
        let state = self
            .state
            .read()
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        Ok(state
            .projects
            .iter()
            .filter(|saved| owner_id.is_none_or(|owner| saved.project.owner_id == owner))
            .cloned()
            .collect())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SortStrategy;

    fn project(name: &str, owner: &str) -> NewProject {
        let material = Material {
            width: 2440.0,
            height: 1220.0,
            thickness: 18.0,
            cost_per_m2: 500.0,
            kerf: 3.0,
            material_type: "MDF".to_string(),
            density: None,
        };
        NewProject {
            name: name.to_string(),
            owner_id: owner.to_string(),
            cuts: vec![CutRequest::new("A", 600.0, 400.0, 2)],
            pattern: CutPattern::empty(SortStrategy::Area, &material),
            material,
        }
    }

    #[test]
    fn save_assigns_sequential_ids() {
        let repo = InMemoryProjectRepository::new();
        let first = repo.save(project("Kitchen", "u1")).expect("saved");
        let second = repo.save(project("Wardrobe", "u1")).expect("saved");

        assert_eq!(first.id, "project-1");
        assert_eq!(second.id, "project-2");
        assert!(first.created_at > 0);
        assert_eq!(first.project.cuts.len(), 1);
    }

    #[test]
    fn list_filters_by_owner() {
        let repo = InMemoryProjectRepository::new();
        repo.save(project("Kitchen", "u1")).expect("saved");
        repo.save(project("Shelf", "u2")).expect("saved");
        repo.save(project("Wardrobe", "u1")).expect("saved");

        let all = repo.list(None).expect("listed");
        assert_eq!(all.len(), 3);

        let mine = repo.list(Some("u1")).expect("listed");
        let names: Vec<_> = mine.iter().map(|p| p.project.name.as_str()).collect();
        assert_eq!(names, vec!["Kitchen", "Wardrobe"]);

        assert!(repo.list(Some("nobody")).expect("listed").is_empty());
    }

    #[test]
    fn empty_name_is_rejected() {
        let repo = InMemoryProjectRepository::new();
        assert!(matches!(
            repo.save(project("   ", "u1")),
            Err(RepositoryError::EmptyName)
        ));
        assert!(repo.list(None).expect("listed").is_empty());
    }

    #[test]
    fn saved_project_serializes_flat() {
        let repo = InMemoryProjectRepository::new();
        let saved = repo.save(project("Kitchen", "u1")).expect("saved");
        let value = serde_json::to_value(&saved).expect("serializable");

        assert_eq!(value["id"], "project-1");
        assert_eq!(value["name"], "Kitchen");
        assert_eq!(value["owner_id"], "u1");
    }
}
