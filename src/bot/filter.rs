//! Natural-language filter extraction
//!
//! Pulls listing criteria out of free text, e.g.
//! "top 3 affordable apartments under $250,000 in Dubai Marina".

use std::sync::OnceLock;

use regex::Regex;

use crate::api::Filters;

/// Criteria parsed from one chat message.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Criteria {
    pub filters: Filters,
    pub limit: Option<usize>,
    /// "affordable" asks for cheapest-first ordering.
    pub sort_by_price: bool,
}

fn top_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)top (\d+)").expect("static pattern"))
}

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s?([\d,]+)").expect("static pattern"))
}

fn location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bin ([A-Za-z\s]+)").expect("static pattern"))
}

pub fn extract_criteria(text: &str) -> Criteria {
    let mut criteria = Criteria::default();

    if let Some(caps) = top_re().captures(text) {
        criteria.limit = caps[1].parse().ok();
    }

    criteria.sort_by_price = text.to_lowercase().contains("affordable");

    if let Some(caps) = price_re().captures(text) {
        criteria.filters.max_price = caps[1].replace(',', "").parse().ok();
    }

    if let Some(caps) = location_re().captures(text) {
        let location = caps[1].trim();
        if !location.is_empty() {
            criteria.filters.location = Some(location.to_string());
        }
    }

    criteria
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_every_criterion_from_a_full_phrase() {
        let criteria =
            extract_criteria("Show me the top 3 affordable homes under $250,000 in Dubai Marina");
        assert_eq!(criteria.limit, Some(3));
        assert!(criteria.sort_by_price);
        assert_eq!(criteria.filters.max_price, Some(250000.0));
        assert_eq!(criteria.filters.location.as_deref(), Some("Dubai Marina"));
    }

    #[test]
    fn plain_text_yields_empty_criteria() {
        let criteria = extract_criteria("hello there");
        assert_eq!(criteria, Criteria::default());
    }

    #[test]
    fn price_parses_with_and_without_commas() {
        assert_eq!(
            extract_criteria("under $1,200,000 please").filters.max_price,
            Some(1200000.0)
        );
        assert_eq!(
            extract_criteria("under $ 500000").filters.max_price,
            Some(500000.0)
        );
    }

    #[test]
    fn top_match_is_case_insensitive() {
        assert_eq!(extract_criteria("TOP 10 listings").limit, Some(10));
    }

    #[test]
    fn affordable_without_other_criteria_only_sets_sort() {
        let criteria = extract_criteria("something affordable");
        assert!(criteria.sort_by_price);
        assert!(criteria.filters.max_price.is_none());
        assert!(criteria.limit.is_none());
    }
}
