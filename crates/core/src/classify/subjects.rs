//! Subject identification
//!
//! Decides which household members a piece of free text concerns, or
//! whether the text is not worth an oracle call at all. Pure and total:
//! for a fixed configuration the same text always yields the same
//! outcome.

use once_cell::sync::Lazy;
use regex::Regex;
use satchel_domain::constants::{
    DEFAULT_ORG_LABEL, NURSERY_LABEL, NURSERY_MARKER, OPERATIONAL_TERMS, SHORT_FRAGMENT_LEN,
};
use satchel_domain::PipelineConfig;

/// `year 3`, `Year 12`, `y3` - numerals checked against the configured
/// year-group list so times like "3:45" never match.
static YEAR_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\by(?:ear)?\s*(\d{1,2})\b").expect("year-group regex"));

/// Outcome of subject identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectOutcome {
    /// Not relevant enough to spend an oracle call on.
    Ignore,
    /// Household-member / year-group labels, deduplicated, in the order
    /// they were found. May carry only the organizational label when an
    /// override keyword forced inclusion.
    Labels(Vec<String>),
}

/// Compiled matching rules for one household configuration.
///
/// Built once from [`PipelineConfig`]; all term lists are lower-cased at
/// construction so `identify` stays allocation-light.
#[derive(Debug, Clone)]
pub struct SubjectMatcher {
    /// (label, lower-cased trigger terms)
    mappings: Vec<(String, Vec<String>)>,
    /// (label, lower name, lower surname, lower nicknames)
    children: Vec<ChildTerms>,
    /// (year numeral, label it resolves to)
    year_labels: Vec<(u32, String)>,
    /// Terms that force inclusion under the organizational label.
    overrides: Vec<String>,
    exclude: Vec<String>,
}

#[derive(Debug, Clone)]
struct ChildTerms {
    label: String,
    name: String,
    surname: Option<String>,
    nicknames: Vec<String>,
}

impl SubjectMatcher {
    pub fn new(config: &PipelineConfig) -> Self {
        let settings = &config.search_settings;

        let mappings = config
            .child_mappings
            .iter()
            .map(|(label, terms)| {
                (label.clone(), terms.iter().map(|t| t.to_lowercase()).collect())
            })
            .collect();

        let children = settings
            .children
            .iter()
            .map(|child| ChildTerms {
                label: child.name.clone(),
                name: child.name.to_lowercase(),
                surname: child.surname.as_ref().map(|s| s.to_lowercase()),
                nicknames: child.nicknames.iter().map(|n| n.to_lowercase()).collect(),
            })
            .collect();

        // Resolve each configured year group to the child in that year,
        // or a plain "Year N" label when no child matches.
        let year_labels = settings
            .year_groups
            .iter()
            .map(|&year| {
                let label = settings
                    .children
                    .iter()
                    .find(|c| c.year_group == Some(year))
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| format!("Year {year}"));
                (year, label)
            })
            .collect();

        let overrides = settings
            .clubs
            .iter()
            .chain(settings.general_keywords.iter())
            .chain(settings.schools.iter())
            .map(|t| t.to_lowercase())
            .chain(OPERATIONAL_TERMS.iter().map(|t| t.to_string()))
            .collect();

        let exclude =
            config.filtering_logic.exclude_keywords.iter().map(|t| t.to_lowercase()).collect();

        Self { mappings, children, year_labels, overrides, exclude }
    }

    /// Identify the household members the text concerns.
    ///
    /// Returns [`SubjectOutcome::Ignore`] when nothing in the text ties it
    /// to the household - the cost-control gate that skips oracle calls.
    pub fn identify(&self, text: &str) -> SubjectOutcome {
        let lower = text.to_lowercase();

        if self.exclude.iter().any(|term| lower.contains(term)) {
            return SubjectOutcome::Ignore;
        }

        let mut labels: Vec<String> = Vec::new();
        let mut push = |labels: &mut Vec<String>, label: &str| {
            if !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        };

        // Configured trigger-term mappings (primary path).
        for (label, terms) in &self.mappings {
            if terms.iter().any(|term| lower.contains(term.as_str())) {
                push(&mut labels, label);
            }
        }

        // Child names and guarded nickname fragments.
        for child in &self.children {
            if lower.contains(&child.name) {
                push(&mut labels, &child.label);
                continue;
            }
            for nickname in &child.nicknames {
                let matched = if nickname.len() < SHORT_FRAGMENT_LEN {
                    // Short fragments are ambiguous ("ben" in "benches");
                    // require the surname to co-occur.
                    match &child.surname {
                        Some(surname) => {
                            contains_word(&lower, nickname) && lower.contains(surname)
                        }
                        None => false,
                    }
                } else {
                    lower.contains(nickname.as_str())
                };
                if matched {
                    push(&mut labels, &child.label);
                    break;
                }
            }
        }

        // Year-group numerals against the configured target list.
        for caps in YEAR_GROUP_RE.captures_iter(&lower) {
            if let Ok(year) = caps[1].parse::<u32>() {
                if let Some((_, label)) = self.year_labels.iter().find(|(y, _)| *y == year) {
                    push(&mut labels, label);
                }
            }
        }

        // Override keywords keep organization-level notices even with no
        // named subject.
        if labels.is_empty() && self.overrides.iter().any(|term| lower.contains(term.as_str())) {
            push(&mut labels, DEFAULT_ORG_LABEL);
        }

        if lower.contains(NURSERY_MARKER) {
            push(&mut labels, NURSERY_LABEL);
        }

        if labels.is_empty() {
            SubjectOutcome::Ignore
        } else {
            SubjectOutcome::Labels(labels)
        }
    }
}

/// Whole-word containment check for short fragments.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.split(|c: char| !c.is_alphanumeric()).any(|word| word == needle)
}
