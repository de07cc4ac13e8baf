//! Static portfolio dataset the knowledge chunks and canned responses are built from.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SAMPLE_PROFILE: &str = include_str!("../../data/sample_profile.json");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioProfile {
    pub name: String,
    pub title: String,
    pub location: String,
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<SkillGroup>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub strengths: Vec<ProfileTrait>,
    #[serde(default)]
    pub weaknesses: Vec<ProfileTrait>,
    #[serde(default)]
    pub hobbies: Vec<ProfileTrait>,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillGroup {
    pub category: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub link: Option<String>,
    pub repo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperienceEntry {
    pub role: String,
    pub organization: String,
    pub period: String,
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub period: String,
}

/// A strength, weakness or hobby.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileTrait {
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub email: String,
    pub phone: Option<String>,
    pub location: String,
    #[serde(default)]
    pub links: Vec<ContactLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactLink {
    pub label: String,
    pub url: String,
}

impl PortfolioProfile {
    /// Built-in demo profile.
    pub fn sample() -> Self {
        // The bundled file is checked by `test_sample_profile_parses`.
        serde_json::from_str(SAMPLE_PROFILE).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Bundled sample profile is malformed");
            Self::empty()
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        let profile: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profile {}", path.display()))?;
        anyhow::ensure!(!profile.name.trim().is_empty(), "profile name must not be empty");
        Ok(profile)
    }

    /// Find the project whose title appears in `query`, preferring the longest title.
    pub fn project_mentioned_in(&self, query: &str) -> Option<&Project> {
        let query_lower = query.to_lowercase();
        self.projects
            .iter()
            .filter(|p| {
                let title = p.title.trim().to_lowercase();
                !title.is_empty() && query_lower.contains(&title)
            })
            .max_by_key(|p| p.title.trim().len())
    }

    fn empty() -> Self {
        Self {
            name: "Portfolio Owner".to_string(),
            title: String::new(),
            location: String::new(),
            summary: String::new(),
            skills: Vec::new(),
            projects: Vec::new(),
            experience: Vec::new(),
            education: Vec::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            hobbies: Vec::new(),
            contact: ContactInfo {
                email: String::new(),
                phone: None,
                location: String::new(),
                links: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_profile_parses() {
        let profile: PortfolioProfile = serde_json::from_str(SAMPLE_PROFILE).unwrap();
        assert!(!profile.name.is_empty());
        assert!(profile.projects.iter().any(|p| p.title == "Droply"));
        assert!(!profile.hobbies.is_empty());
    }

    #[test]
    fn test_project_mentioned_in_is_case_insensitive() {
        let profile = PortfolioProfile::sample();
        let project = profile.project_mentioned_in("tell me about DROPLY please").unwrap();
        assert_eq!(project.title, "Droply");
        assert!(profile.project_mentioned_in("show me your projects").is_none());
    }

    #[test]
    fn test_longest_title_wins() {
        let mut profile = PortfolioProfile::sample();
        let mut pro = profile.projects[0].clone();
        pro.title = "Droply Pro".to_string();
        profile.projects.push(pro);

        let project = profile.project_mentioned_in("how does droply pro work").unwrap();
        assert_eq!(project.title, "Droply Pro");
    }

    #[test]
    fn test_from_file_rejects_missing_file() {
        let path = std::env::temp_dir().join("folio-no-such-profile.json");
        assert!(PortfolioProfile::from_file(&path).is_err());
    }
}
