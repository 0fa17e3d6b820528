//! Text formatting helpers for report output.

use std::sync::OnceLock;

use regex::Regex;

fn subteam_mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<!subteam\^[^>]+>").unwrap())
}

fn user_mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<@\w+>").unwrap())
}

fn labeled_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<https?://[^|>]+\|([^>]+)>").unwrap())
}

fn bare_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<(https?://[^>]+)>").unwrap())
}

/// Rewrites Slack markup into plain display text: group mentions become the
/// supplied alias, user mentions are dropped, and `<url|label>` / `<url>`
/// links collapse to their label or bare URL.
pub fn clean_slack_formatting(text: &str, group_alias: &str) -> String {
    let text = subteam_mention_pattern().replace_all(text, group_alias);
    let text = user_mention_pattern().replace_all(&text, "");
    let text = labeled_link_pattern().replace_all(&text, "$1");
    let text = bare_link_pattern().replace_all(&text, "$1");
    text.trim().to_string()
}

/// Renders a duration in minutes as a compact human-readable value.
pub fn format_response_time(minutes: f64) -> String {
    if minutes < 60.0 {
        format!("{minutes:.0}m")
    } else if minutes < 1_440.0 {
        format!("{:.1}h", minutes / 60.0)
    } else {
        format!("{:.1}d", minutes / 1_440.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{clean_slack_formatting, format_response_time};

    #[test]
    fn unit_clean_slack_formatting_rewrites_mentions_and_links() {
        assert_eq!(
            clean_slack_formatting("<!subteam^S123ABC> please review", "@Team"),
            "@Team please review"
        );
        assert_eq!(clean_slack_formatting("thanks <@U123>!", "@Team"), "thanks !");
        assert_eq!(
            clean_slack_formatting("see <https://example.com/doc|the doc>", "@Team"),
            "see the doc"
        );
        assert_eq!(
            clean_slack_formatting("see <https://example.com/doc>", "@Team"),
            "see https://example.com/doc"
        );
    }

    #[test]
    fn unit_format_response_time_switches_units_at_hour_and_day() {
        assert_eq!(format_response_time(42.0), "42m");
        assert_eq!(format_response_time(90.0), "1.5h");
        assert_eq!(format_response_time(2_880.0), "2.0d");
    }
}
