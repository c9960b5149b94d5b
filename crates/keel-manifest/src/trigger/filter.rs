//! String filters used by trigger firing predicates.

use regex::Regex;
use tracing::debug;

const NEGATED_PREFIX: &str = "!~";
const MATCH_PREFIX: &str = "=~";

/// Matches `value` against a filter holding an anchored regex.
///
/// A `!~` prefix inverts the outcome, `=~` is an explicit positive match.
/// An empty filter matches anything; a filter that does not compile matches
/// nothing.
pub(crate) fn matches(filter: &str, value: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() {
        return true;
    }

    let (pattern, negated) = if let Some(pattern) = filter.strip_prefix(NEGATED_PREFIX) {
        (pattern.trim(), true)
    } else if let Some(pattern) = filter.strip_prefix(MATCH_PREFIX) {
        (pattern.trim(), false)
    } else {
        (filter, false)
    };

    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => re.is_match(value) != negated,
        Err(e) => {
            debug!(filter = %filter, error = %e, "Trigger filter is not a valid regex");
            false
        }
    }
}

/// Case-insensitive exact comparison for pipeline and repository names.
pub(crate) fn names_match(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}
