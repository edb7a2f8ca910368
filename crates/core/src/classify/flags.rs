//! Gift and costume heuristics
//!
//! Small fixed term sets, case-insensitive substring matching. The
//! enricher applies the side effects (reminder line, title marker,
//! priority color).

const GIFT_TERMS: &[&str] = &["birthday party", "party"];

const COSTUME_TERMS: &[&str] = &["wear", "costume", "dress up", "fancy dress"];

/// True when the event type or description carries a birthday/party
/// marker. Downstream effect: the gift reminder line is prepended to the
/// description.
pub fn needs_gift(event_type: &str, description: &str) -> bool {
    let haystack = format!("{} {}", event_type, description).to_lowercase();
    GIFT_TERMS.iter().any(|term| haystack.contains(term))
}

/// True when the combined text mentions a dress-up requirement.
/// Downstream effect: high-priority title marker and priority color tag.
pub fn needs_costume(text: &str) -> bool {
    let lower = text.to_lowercase();
    COSTUME_TERMS.iter().any(|term| lower.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_in_description_needs_gift() {
        assert!(needs_gift("School Disco", "PARTY for the whole class"));
        assert!(needs_gift("Birthday Party", ""));
    }

    #[test]
    fn assembly_does_not_need_gift() {
        assert!(!needs_gift("Assembly", "assembly tomorrow"));
    }

    #[test]
    fn costume_keywords_flag_priority() {
        assert!(needs_costume("Wear a costume!"));
        assert!(needs_costume("fancy dress optional"));
        assert!(needs_costume("Please dress up as a book character"));
    }

    #[test]
    fn plain_notice_is_not_a_costume_event() {
        assert!(!needs_costume("Parents evening sign-up now open"));
    }
}
