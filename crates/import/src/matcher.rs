//! Fuzzy nearest-match over free text, used to resolve sportsbook names
//! from CSV extracts to canonical clients. Pure and deterministic.

/// Strict upper bound on the normalized edit distance accepted by pass 2.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.3;

/// Case- and whitespace-insensitive projection used by both passes.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Resolve `keyword` against `options` in two passes.
///
/// Pass 1: substring containment. The first option (in input order) whose
/// normalized projection contains the normalized keyword wins immediately.
/// Pass 2: normalized Levenshtein distance (edit distance over the longer
/// length) against every option; the minimum wins, and only if strictly
/// below `threshold`. Ties keep the earlier option.
pub fn find_closest_match<'a, T, F>(
    keyword: &str,
    options: &'a [T],
    project: F,
    threshold: f64,
) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    let needle = normalize(keyword);
    if needle.is_empty() || options.is_empty() {
        return None;
    }

    for option in options {
        if normalize(project(option)).contains(&needle) {
            return Some(option);
        }
    }

    let mut best: Option<(&T, f64)> = None;
    for option in options {
        let haystack = normalize(project(option));
        let max_len = needle.chars().count().max(haystack.chars().count());
        if max_len == 0 {
            continue;
        }
        let distance = strsim::levenshtein(&needle, &haystack) as f64 / max_len as f64;
        if best.as_ref().map_or(true, |&(_, d)| distance < d) {
            best = Some((option, distance));
        }
    }

    match best {
        Some((option, distance)) if distance < threshold => Some(option),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec![
            "PointsBet".to_string(),
            "Bet99".to_string(),
            "Sports Interaction".to_string(),
        ]
    }

    #[test]
    fn test_containment_short_circuits_in_input_order() {
        let options = names();
        let hit = find_closest_match(
            "pointsbet",
            &options,
            |n| n.as_str(),
            DEFAULT_MATCH_THRESHOLD,
        );
        assert_eq!(hit.map(String::as_str), Some("PointsBet"));
    }

    #[test]
    fn test_containment_ignores_case_and_spaces() {
        let options = names();
        let hit = find_closest_match(
            "sportsinteraction",
            &options,
            |n| n.as_str(),
            DEFAULT_MATCH_THRESHOLD,
        );
        assert_eq!(hit.map(String::as_str), Some("Sports Interaction"));
    }

    #[test]
    fn test_edit_distance_pass_catches_typos() {
        let options = names();
        // One substitution away from "bet99" -> distance 1/5 = 0.2.
        let hit = find_closest_match("bat99", &options, |n| n.as_str(), DEFAULT_MATCH_THRESHOLD);
        assert_eq!(hit.map(String::as_str), Some("Bet99"));
    }

    #[test]
    fn test_no_match_above_threshold() {
        let options = names();
        let miss = find_closest_match("zzzzz", &options, |n| n.as_str(), DEFAULT_MATCH_THRESHOLD);
        assert!(miss.is_none());
    }

    #[test]
    fn test_empty_inputs_never_match() {
        let options = names();
        assert!(find_closest_match("", &options, |n| n.as_str(), 0.3).is_none());

        let no_options: Vec<String> = vec![];
        assert!(find_closest_match("pointsbet", &no_options, |n| n.as_str(), 0.3).is_none());
    }
}
