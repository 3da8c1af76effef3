use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    let month = r"(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?";
    Regex::new(&format!(
        r"(?i)\b(?:\d{{1,2}}\s+{month},?\s+\d{{4}}|{month}\s+\d{{1,2}},?\s+\d{{4}})\b"
    ))
    .unwrap()
});

/// Date-like strings ("21 Aug 2025", "August 21, 2025") in document order,
/// each kept once.
pub fn extract_dates(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    RE_DATE
        .find_iter(html)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|d| seen.insert(d.clone()))
        .collect()
}

/// Hand out dates by position: the i-th date found goes to the i-th slot.
/// This trusts the listing to show dates in the same order as posts; extra
/// dates are dropped and slots beyond the last date stay empty.
pub fn assign_by_position(dates: Vec<String>, slots: usize) -> Vec<Option<String>> {
    let mut out: Vec<Option<String>> = dates.into_iter().take(slots).map(Some).collect();
    out.resize(slots, None);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_both_day_first_and_month_first() {
        let html = r#"<time>21 Aug 2025</time><span>November 11, 2025</span>
                      <time>21  Aug 2025</time><p>3 Sept. 2024</p><p>12 Foo 2025</p>"#;
        assert_eq!(
            extract_dates(html),
            vec!["21 Aug 2025", "November 11, 2025", "3 Sept. 2024"]
        );
    }

    #[test]
    fn no_dates_is_fine() {
        assert!(extract_dates("<p>2025 was a year</p>").is_empty());
    }

    #[test]
    fn positional_assignment_pads_and_truncates() {
        let dates = vec!["1 Jan 2025".to_string(), "2 Feb 2025".to_string()];
        assert_eq!(
            assign_by_position(dates.clone(), 3),
            vec![Some("1 Jan 2025".into()), Some("2 Feb 2025".into()), None]
        );
        assert_eq!(assign_by_position(dates, 1), vec![Some("1 Jan 2025".into())]);
    }
}
