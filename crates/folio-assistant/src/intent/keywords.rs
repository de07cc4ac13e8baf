//! Keyword table for the rule router.
//!
//! Matching is substring containment against the normalized query padded with a
//! space on each side. A keyword written with leading/trailing spaces therefore
//! only matches on word boundaries (`" fun "` does not fire on "function").
//! Each category lists the typo rewrites applied to its keywords; variants are
//! expanded once when the router is built.

use serde::{Deserialize, Serialize};

/// Content categories, in no particular order. Precedence lives in [`CATEGORY_PRECEDENCE`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    About,
    Skills,
    Projects,
    Experience,
    Strengths,
    Weaknesses,
    Hobbies,
    Contact,
}

impl IntentCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::About => "About me",
            Self::Skills => "Skills",
            Self::Projects => "Projects",
            Self::Experience => "Experience & education",
            Self::Strengths => "Strengths",
            Self::Weaknesses => "Weaknesses",
            Self::Hobbies => "Hobbies",
            Self::Contact => "Contact",
        }
    }

    /// The query a suggestion chip sends for this category.
    pub fn canonical_query(&self) -> &'static str {
        match self {
            Self::About => "Tell me about yourself",
            Self::Skills => "What are your technical skills?",
            Self::Projects => "Show me your projects",
            Self::Experience => "Tell me about your experience",
            Self::Strengths => "What are your strengths?",
            Self::Weaknesses => "What are your weaknesses?",
            Self::Hobbies => "What are your hobbies?",
            Self::Contact => "How can I contact you?",
        }
    }
}

/// Evaluation order after the project-title override.
///
/// Trait categories come before `About` so "what are your hobbies" is not taken
/// as a generic about-me question. `Experience` precedes `Skills` and `About`
/// because their vocabularies overlap.
pub const CATEGORY_PRECEDENCE: [IntentCategory; 8] = [
    IntentCategory::Hobbies,
    IntentCategory::Strengths,
    IntentCategory::Weaknesses,
    IntentCategory::Experience,
    IntentCategory::Skills,
    IntentCategory::About,
    IntentCategory::Projects,
    IntentCategory::Contact,
];

/// Deterministic misspelling rewrites. Each produces variants with exactly one edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypoRule {
    /// Swap a single `e` for `a` or `a` for `e` ("experiance").
    SwapEA,
    /// `ies` ending to `ys` and `y` ending to `ie` ("hobbys", "hobbie").
    IeY,
    /// Double a single trailing consonant or undouble a doubled one ("skil", "projectt").
    TrailingConsonant,
}

pub struct CategoryKeywords {
    pub category: IntentCategory,
    pub keywords: &'static [&'static str],
    pub typo_rules: &'static [TypoRule],
}

pub const KEYWORD_TABLE: &[CategoryKeywords] = &[
    CategoryKeywords {
        category: IntentCategory::Hobbies,
        keywords: &[
            "hobby", "hobbies", "free time", "spare time", " fun ", "pastime", "leisure",
            "weekend", "interests", "outside of work", "outside work",
        ],
        typo_rules: &[TypoRule::IeY, TypoRule::TrailingConsonant],
    },
    CategoryKeywords {
        category: IntentCategory::Strengths,
        keywords: &[
            "strength", "strong point", "good at", "best at", "excel at", "superpower",
            "best quality", "best qualities",
        ],
        typo_rules: &[TypoRule::SwapEA, TypoRule::IeY],
    },
    CategoryKeywords {
        category: IntentCategory::Weaknesses,
        keywords: &[
            "weakness", "weak point", "weak spot", "bad at", "struggle with", "areas of improvement",
            "area of improvement", "improve on", "shortcoming",
        ],
        typo_rules: &[TypoRule::TrailingConsonant],
    },
    CategoryKeywords {
        category: IntentCategory::Experience,
        keywords: &[
            "experience", "work history", "worked at", "where have you worked", "where do you work",
            "tell me about your work", " job ", " jobs ", "career", "internship", " intern ", "employment",
            "education", "college", "university", "degree", "studied", "qualification", "resume",
            " cv ", "timeline",
        ],
        typo_rules: &[TypoRule::SwapEA, TypoRule::TrailingConsonant],
    },
    CategoryKeywords {
        category: IntentCategory::Skills,
        keywords: &[
            "skill", "tech stack", "techstack", "technolog", "programming", "language", " tools ",
            "framework", "expertise", "proficien", "what can you do", "technical", " stack ",
        ],
        typo_rules: &[TypoRule::SwapEA, TypoRule::TrailingConsonant],
    },
    CategoryKeywords {
        category: IntentCategory::About,
        keywords: &[
            " about you ", "about yourself", "who are you", "introduce", "your background",
            "your story", " bio ", "who is", " yourself ",
        ],
        typo_rules: &[TypoRule::SwapEA],
    },
    CategoryKeywords {
        category: IntentCategory::Projects,
        keywords: &[
            "project", "portfolio", "what have you built", "things you built", "you made",
            "you created", " apps ", "side project", "work samples", "showcase",
        ],
        typo_rules: &[TypoRule::SwapEA, TypoRule::TrailingConsonant],
    },
    CategoryKeywords {
        category: IntentCategory::Contact,
        keywords: &[
            "contact", "email", "e mail", "reach you", "reach out", "get in touch", " hire ",
            "phone", "linkedin", "message you", "connect with you",
        ],
        typo_rules: &[TypoRule::SwapEA, TypoRule::TrailingConsonant],
    },
];

/// The keyword plus every single-edit variant its rules produce, deduplicated,
/// keyword first. Leading/trailing boundary spaces are preserved on every variant.
pub fn expand_keyword(keyword: &str, rules: &[TypoRule]) -> Vec<String> {
    let core = keyword.trim();
    let lead = &keyword[..keyword.len() - keyword.trim_start().len()];
    let trail = &keyword[keyword.trim_end().len()..];

    let mut variants = vec![core.to_string()];
    for rule in rules {
        let produced = match rule {
            TypoRule::SwapEA => swap_ea(core),
            TypoRule::IeY => ie_y(core),
            TypoRule::TrailingConsonant => trailing_consonant(core),
        };
        for v in produced {
            if !v.is_empty() && !variants.contains(&v) {
                variants.push(v);
            }
        }
    }

    variants
        .into_iter()
        .map(|v| format!("{}{}{}", lead, v, trail))
        .collect()
}

fn swap_ea(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut out = Vec::new();
    for (i, c) in chars.iter().enumerate() {
        let replacement = match c {
            'e' => 'a',
            'a' => 'e',
            _ => continue,
        };
        let mut variant = chars.clone();
        variant[i] = replacement;
        out.push(variant.into_iter().collect());
    }
    out
}

fn ie_y(word: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(stem) = word.strip_suffix("ies") {
        out.push(format!("{}ys", stem));
    } else if let Some(stem) = word.strip_suffix('y') {
        out.push(format!("{}ie", stem));
    }
    out
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn trailing_consonant(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let n = chars.len();
    match n {
        0 => Vec::new(),
        1 => {
            if is_consonant(chars[0]) {
                vec![format!("{}{}", chars[0], chars[0])]
            } else {
                Vec::new()
            }
        }
        _ => {
            let last = chars[n - 1];
            if !is_consonant(last) {
                return Vec::new();
            }
            if chars[n - 2] == last {
                vec![chars[..n - 1].iter().collect()]
            } else {
                let mut doubled: String = chars.iter().collect();
                doubled.push(last);
                vec![doubled]
            }
        }
    }
}
