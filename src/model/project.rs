//! Tracker projects and the per-run project registry.

use serde::{Deserialize, Serialize};

/// An issue-tracker project, identified by its short name (e.g. `PYAT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub short_name: String,
}

impl Project {
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
        }
    }
}

/// The ordered, immutable list of projects known for one run.
///
/// Order matters: the scanner picks the first project whose short name
/// prefixes an annotation, so `AT` listed before `PYAT` wins for `#AT-1`
/// but can never shadow `#PYAT-1` (the match requires `<short>-`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRegistry {
    projects: Vec<Project>,
}

impl ProjectRegistry {
    /// Builds a registry, dropping empty and repeated short names.
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        let mut unique: Vec<Project> = Vec::new();
        for project in projects {
            if project.short_name.is_empty() || unique.contains(&project) {
                continue;
            }
            unique.push(project);
        }
        Self { projects: unique }
    }

    /// Reconstructs a registry from cached short names.
    pub fn from_short_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(names.iter().map(|n| Project::new(n.as_ref())))
    }

    /// Restricts the registry to the given short names, keeping registry order.
    ///
    /// An empty list means no restriction.
    #[must_use]
    pub fn restricted_to<S: AsRef<str>>(&self, included: &[S]) -> Self {
        let included: Vec<&str> = included
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();
        if included.is_empty() {
            return self.clone();
        }
        Self {
            projects: self
                .projects
                .iter()
                .filter(|p| included.contains(&p.short_name.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn short_names(&self) -> Vec<String> {
        self.projects.iter().map(|p| p.short_name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_duplicates_and_empty_names() {
        let registry = ProjectRegistry::new([
            Project::new("TP1"),
            Project::new(""),
            Project::new("TP1"),
            Project::new("TP2"),
        ]);
        assert_eq!(registry.short_names(), vec!["TP1", "TP2"]);
    }

    #[test]
    fn restriction_keeps_registry_order() {
        let registry = ProjectRegistry::from_short_names(&["A", "B", "C"]);
        let restricted = registry.restricted_to(&["C", " A "]);
        assert_eq!(restricted.short_names(), vec!["A", "C"]);
    }

    #[test]
    fn empty_restriction_keeps_everything() {
        let registry = ProjectRegistry::from_short_names(&["A", "B"]);
        let restricted = registry.restricted_to(&["", "  "]);
        assert_eq!(restricted.len(), 2);
    }
}
