//! Canned replies: fixed preamble, a structured component and follow-up suggestions.

use serde::{Deserialize, Serialize};

use super::keywords::IntentCategory;
use crate::knowledge::profile::{
    ContactInfo, EducationEntry, ExperienceEntry, PortfolioProfile, ProfileTrait, Project, SkillGroup,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSummary {
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HelpEntry {
    pub category: IntentCategory,
    pub label: String,
    pub example: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraitKind {
    Strengths,
    Weaknesses,
    Hobbies,
}

/// Renderable payload attached to an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum ComponentPayload {
    About {
        name: String,
        title: String,
        location: String,
        summary: String,
    },
    Skills {
        groups: Vec<SkillGroup>,
    },
    Projects {
        projects: Vec<ProjectSummary>,
    },
    ProjectDetail {
        project: Project,
    },
    Experience {
        timeline: Vec<ExperienceEntry>,
        education: Vec<EducationEntry>,
    },
    Traits {
        kind: TraitKind,
        items: Vec<ProfileTrait>,
    },
    Contact {
        contact: ContactInfo,
    },
    Help {
        entries: Vec<HelpEntry>,
    },
}

/// What a canned reply answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CannedTopic {
    Category(IntentCategory),
    Project(String),
    Help,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CannedResponse {
    pub topic: CannedTopic,
    pub text: String,
    pub component: ComponentPayload,
    pub suggestions: Vec<String>,
}

/// Follow-ups per category. Never includes the category itself.
fn suggestion_categories(category: IntentCategory) -> &'static [IntentCategory] {
    use IntentCategory::*;
    match category {
        About => &[Skills, Projects, Experience],
        Skills => &[Projects, Experience, Strengths],
        Projects => &[Experience, Skills, Strengths],
        Experience => &[Skills, Projects, Contact],
        Strengths => &[Weaknesses, Hobbies, Experience],
        Weaknesses => &[Strengths, Hobbies, About],
        Hobbies => &[Strengths, About, Contact],
        Contact => &[Projects, About],
    }
}

fn queries(categories: &[IntentCategory]) -> Vec<String> {
    categories.iter().map(|c| c.canonical_query().to_string()).collect()
}

pub fn suggestions_for(category: IntentCategory) -> Vec<String> {
    queries(suggestion_categories(category))
}

pub fn category_response(profile: &PortfolioProfile, category: IntentCategory) -> CannedResponse {
    let (text, component) = match category {
        IntentCategory::About => (
            format!("Hi! I'm {}, a {}. Here's a quick introduction:", profile.name, profile.title),
            ComponentPayload::About {
                name: profile.name.clone(),
                title: profile.title.clone(),
                location: profile.location.clone(),
                summary: profile.summary.clone(),
            },
        ),
        IntentCategory::Skills => (
            "Here's a breakdown of my technical skills:".to_string(),
            ComponentPayload::Skills {
                groups: profile.skills.clone(),
            },
        ),
        IntentCategory::Projects => (
            "Here are some of the projects I've built:".to_string(),
            ComponentPayload::Projects {
                projects: profile
                    .projects
                    .iter()
                    .map(|p| ProjectSummary {
                        title: p.title.clone(),
                        description: p.description.clone(),
                        tech_stack: p.tech_stack.clone(),
                    })
                    .collect(),
            },
        ),
        IntentCategory::Experience => (
            "Here's my work experience and education:".to_string(),
            ComponentPayload::Experience {
                timeline: profile.experience.clone(),
                education: profile.education.clone(),
            },
        ),
        IntentCategory::Strengths => (
            "These are the strengths I bring to a team:".to_string(),
            ComponentPayload::Traits {
                kind: TraitKind::Strengths,
                items: profile.strengths.clone(),
            },
        ),
        IntentCategory::Weaknesses => (
            "Here are the areas I'm actively working to improve:".to_string(),
            ComponentPayload::Traits {
                kind: TraitKind::Weaknesses,
                items: profile.weaknesses.clone(),
            },
        ),
        IntentCategory::Hobbies => (
            "When I'm not coding, this is what I enjoy:".to_string(),
            ComponentPayload::Traits {
                kind: TraitKind::Hobbies,
                items: profile.hobbies.clone(),
            },
        ),
        IntentCategory::Contact => (
            "I'd love to hear from you! Here's how to reach me:".to_string(),
            ComponentPayload::Contact {
                contact: profile.contact.clone(),
            },
        ),
    };

    CannedResponse {
        topic: CannedTopic::Category(category),
        text,
        component,
        suggestions: suggestions_for(category),
    }
}

pub fn project_response(project: &Project) -> CannedResponse {
    CannedResponse {
        topic: CannedTopic::Project(project.title.clone()),
        text: format!("Here are the details of {}:", project.title),
        component: ComponentPayload::ProjectDetail {
            project: project.clone(),
        },
        suggestions: queries(&[
            IntentCategory::Projects,
            IntentCategory::Skills,
            IntentCategory::Contact,
        ]),
    }
}

pub fn help_response() -> CannedResponse {
    use IntentCategory::*;
    let entries = [About, Skills, Projects, Experience, Strengths, Weaknesses, Hobbies, Contact]
        .iter()
        .map(|c| HelpEntry {
            category: *c,
            label: c.label().to_string(),
            example: c.canonical_query().to_string(),
        })
        .collect();

    CannedResponse {
        topic: CannedTopic::Help,
        text: "I'm not sure I understood that. Here's what you can ask me about:".to_string(),
        component: ComponentPayload::Help { entries },
        suggestions: queries(&[About, Skills, Projects, Experience]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::keywords::CATEGORY_PRECEDENCE;

    #[test]
    fn test_suggestions_exclude_answered_category() {
        for category in CATEGORY_PRECEDENCE {
            let suggestions = suggestions_for(category);
            assert!((2..=4).contains(&suggestions.len()), "{:?}", category);
            assert!(!suggestions.contains(&category.canonical_query().to_string()));
        }
    }

    #[test]
    fn test_projects_suggestions() {
        assert_eq!(
            suggestions_for(IntentCategory::Projects),
            vec![
                "Tell me about your experience",
                "What are your technical skills?",
                "What are your strengths?"
            ]
        );
    }

    #[test]
    fn test_help_lists_every_category() {
        let help = help_response();
        match help.component {
            ComponentPayload::Help { entries } => assert_eq!(entries.len(), 8),
            other => panic!("unexpected component {:?}", other),
        }
    }

    #[test]
    fn test_component_serializes_with_tag() {
        let profile = PortfolioProfile::sample();
        let response = category_response(&profile, IntentCategory::Hobbies);
        let json = serde_json::to_value(&response.component).unwrap();
        assert_eq!(json["component"], "traits");
        assert_eq!(json["kind"], "hobbies");
    }
}
