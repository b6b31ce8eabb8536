//! InfluxQL statements issued by the migration

use crate::migrate::TimeRange;

/// Regex literal for a measurement pattern, with `/` escaped.
fn regex_literal(pattern: &str) -> String {
    format!("/{}/", pattern.replace('/', "\\/"))
}

/// First value of every series matching `pattern`.
pub fn first_value(pattern: &str) -> String {
    format!("SELECT first(value) FROM {};", regex_literal(pattern))
}

/// Every row of every series matching `pattern` inside `[range.start, range.end)`.
pub fn select_range(pattern: &str, range: TimeRange) -> String {
    format!(
        "SELECT * FROM {} WHERE time >= {} and time < {}",
        regex_literal(pattern),
        range.start,
        range.end
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_statement() {
        assert_eq!(
            first_value("network-in-percent"),
            "SELECT first(value) FROM /network-in-percent/;"
        );
    }

    #[test]
    fn select_range_is_half_open() {
        let q = select_range("network-out-percent", TimeRange::new(1000, 2000));
        assert_eq!(
            q,
            "SELECT * FROM /network-out-percent/ WHERE time >= 1000 and time < 2000"
        );
    }

    #[test]
    fn slash_in_pattern_is_escaped() {
        assert_eq!(first_value("a/b"), "SELECT first(value) FROM /a\\/b/;");
    }
}
