//! Turns the structured profile into natural-language chunks.
//!
//! Ids are positional (`project-1`, `skills-2`, ...) so re-running the chunker on
//! unchanged profile data yields the same chunk list in the same order.

use crate::types::{ChunkDraft, ChunkType};

use super::profile::{PortfolioProfile, ProfileTrait};

pub fn chunk_profile(profile: &PortfolioProfile) -> Vec<ChunkDraft> {
    let mut chunks = Vec::new();

    chunks.push(ChunkDraft::new(
        "bio",
        ChunkType::Bio,
        format!("About {}", profile.name),
        format!(
            "{} is a {} based in {}. {}",
            profile.name, profile.title, profile.location, profile.summary
        ),
    ));

    for (i, group) in profile.skills.iter().enumerate() {
        if group.items.is_empty() {
            continue;
        }
        chunks.push(ChunkDraft::new(
            format!("skills-{}", i + 1),
            ChunkType::Skill,
            format!("{} skills", group.category),
            format!(
                "{}'s {} skills: {}.",
                profile.name,
                group.category,
                group.items.join(", ")
            ),
        ));
    }

    for (i, project) in profile.projects.iter().enumerate() {
        let mut text = format!("Project {}: {}", project.title, project.description);
        if !project.tech_stack.is_empty() {
            text.push_str(&format!(" Built with {}.", project.tech_stack.join(", ")));
        }
        if !project.highlights.is_empty() {
            text.push_str(&format!(" Highlights: {}.", project.highlights.join("; ")));
        }
        if let Some(link) = &project.link {
            text.push_str(&format!(" Live at {}.", link));
        }
        if let Some(repo) = &project.repo {
            text.push_str(&format!(" Source: {}.", repo));
        }
        chunks.push(ChunkDraft::new(
            format!("project-{}", i + 1),
            ChunkType::Project,
            project.title.clone(),
            text,
        ));
    }

    for (i, entry) in profile.experience.iter().enumerate() {
        let mut text = format!(
            "{} worked as {} at {} ({}). {}",
            profile.name, entry.role, entry.organization, entry.period, entry.summary
        );
        if !entry.highlights.is_empty() {
            text.push_str(&format!(" Highlights: {}.", entry.highlights.join("; ")));
        }
        chunks.push(ChunkDraft::new(
            format!("experience-{}", i + 1),
            ChunkType::Experience,
            format!("{} at {}", entry.role, entry.organization),
            text,
        ));
    }

    for (i, entry) in profile.education.iter().enumerate() {
        chunks.push(ChunkDraft::new(
            format!("education-{}", i + 1),
            ChunkType::Experience,
            entry.degree.clone(),
            format!(
                "{} studied {} at {} ({}).",
                profile.name, entry.degree, entry.institution, entry.period
            ),
        ));
    }

    for (id, label, traits) in [
        ("strengths", "Strengths", &profile.strengths),
        ("weaknesses", "Weaknesses", &profile.weaknesses),
        ("hobbies", "Hobbies", &profile.hobbies),
    ] {
        if let Some(text) = trait_text(&profile.name, label, traits) {
            chunks.push(ChunkDraft::new(id, ChunkType::Trait, label, text));
        }
    }

    let contact = &profile.contact;
    let mut text = format!("You can reach {} by email at {}.", profile.name, contact.email);
    if let Some(phone) = &contact.phone {
        text.push_str(&format!(" Phone: {}.", phone));
    }
    for link in &contact.links {
        text.push_str(&format!(" {}: {}.", link.label, link.url));
    }
    chunks.push(ChunkDraft::new("contact", ChunkType::Contact, "Contact", text));

    chunks.retain(|c| !c.text.trim().is_empty());
    chunks
}

fn trait_text(name: &str, label: &str, traits: &[ProfileTrait]) -> Option<String> {
    if traits.is_empty() {
        return None;
    }
    let items = traits
        .iter()
        .map(|t| format!("{} ({})", t.title, t.detail))
        .collect::<Vec<_>>()
        .join("; ");
    Some(format!("{} of {}: {}.", label, name, items))
}
