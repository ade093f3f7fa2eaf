//! Report encodings
//!
//! Three independent encodings of a [`Report`]; downstream consumers (cron
//! mail, telegra.ph pages) depend on the exact shape of each one.
//!
//! Ordering contracts differ on purpose: plain text and HTML sort the count
//! tables descending by count (stable, so ties keep first-seen order), while
//! JSON keeps pure accumulation order.

use crate::insight::GOOGLE_AI_MODEL;
use crate::report::models::{CountTable, Report, SubReport};

pub const PROJECT_URL: &str = env!("CARGO_PKG_REPOSITORY");

/// Render a report as the fixed multi-paragraph plain-text block.
pub fn render_plain(report: &Report, days_a: i64, days_b: i64) -> String {
    let mut out = format!(
        "\n>>> Generated Report:\n\n{}\n{}",
        plain_window(&report.window_a, days_a),
        plain_window(&report.window_b, days_b),
    );

    if let Some(insight) = &report.insight {
        out.push_str(&format!(
            "\n\n===\n* Generated insights (by {GOOGLE_AI_MODEL}):\n\n{insight}"
        ));
    }

    out
}

fn plain_window(window: &SubReport, days: i64) -> String {
    format!(
        "> {} ({} days)\n* Total: {} ban action(s)\n\n* Protocols:\n{}\n\n* Originating Countries:\n{}\n---\n",
        window.from_to,
        days,
        window.total_count,
        counts_block(&window.protocol_counts, "  "),
        counts_block(&window.country_counts, "  "),
    )
}

/// Render a report as JSON. The only encoding that can fail.
pub fn render_json(report: &Report) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(report)
}

/// Render a report as the HTML fragment published to telegra.ph.
pub fn render_html(report: &Report, days_a: i64, days_b: i64) -> String {
    let mut out = format!(
        "<h3>Generated Report</h3>\n\n{}{}\n<i>report generated by <a href=\"{}\">banlog</a></i>",
        html_window(&report.window_a, days_a),
        html_window(&report.window_b, days_b),
        PROJECT_URL,
    );

    if let Some(insight) = &report.insight {
        out.push_str(&format!(
            "\n\n<p>\n<h4>Insights</h4>\n\n{insight}\n</p>\n\n<i>insights generated by <strong>{GOOGLE_AI_MODEL}</strong></i>"
        ));
    }

    out
}

fn html_window(window: &SubReport, days: i64) -> String {
    format!(
        "<p>\n<h4>{} ({} days)</h4>\n\n<strong>Total</strong> {} ban action(s)\n\n<strong>Protocols</strong>\n{}\n\n<strong>Originating Countries</strong>\n{}\n</p>\n",
        window.from_to,
        days,
        window.total_count,
        counts_block(&window.protocol_counts, "• "),
        counts_block(&window.country_counts, "• "),
    )
}

fn counts_block(counts: &CountTable, prefix: &str) -> String {
    counts
        .sorted_desc()
        .iter()
        .map(|e| format!("{prefix}{}: {}", e.key, e.count))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::models::CountEntry;

    fn table(entries: &[(&str, i64)]) -> CountTable {
        let mut t = CountTable::new();
        for (key, count) in entries {
            for _ in 0..*count {
                t.increment(key);
            }
        }
        t
    }

    fn sample_report() -> Report {
        Report {
            window_a: SubReport {
                from_to: "2024-01-01 00:00:00 ~ 2024-01-08 00:00:00".to_string(),
                total_count: 14,
                protocol_counts: table(&[("ssh", 5), ("ftp", 9)]),
                country_counts: table(&[("China", 8), ("Russia", 6)]),
            },
            window_b: SubReport {
                from_to: "2023-12-09 00:00:00 ~ 2024-01-08 00:00:00".to_string(),
                total_count: 20,
                protocol_counts: table(&[("ssh", 11), ("ftp", 9)]),
                country_counts: table(&[("China", 12), ("Russia", 8)]),
            },
            insight: None,
        }
    }

    #[test]
    fn test_plain_sorts_descending_by_count() {
        let text = render_plain(&sample_report(), 7, 30);

        // ftp (9) outnumbers ssh (5) in window A and must come first even
        // though ssh was accumulated first
        let ftp = text.find("  ftp: 9").unwrap();
        let ssh = text.find("  ssh: 5").unwrap();
        assert!(ftp < ssh);

        assert!(text.contains(">>> Generated Report:"));
        assert!(text.contains("* Total: 14 ban action(s)"));
        assert!(text.contains("(7 days)"));
        assert!(text.contains("(30 days)"));
        assert!(!text.contains("Generated insights"));
    }

    #[test]
    fn test_plain_appends_insight_section() {
        let mut report = sample_report();
        report.insight = Some("nothing unusual".to_string());

        let text = render_plain(&report, 7, 30);
        assert!(text.contains(&format!("* Generated insights (by {GOOGLE_AI_MODEL}):")));
        assert!(text.ends_with("nothing unusual"));
    }

    #[test]
    fn test_json_preserves_insertion_order() {
        let bytes = render_json(&sample_report()).unwrap();
        let json = String::from_utf8(bytes).unwrap();

        // insertion order, not count order: ssh was seen before ftp
        let ssh = json.find(r#"{"key":"ssh","count":5}"#).unwrap();
        let ftp = json.find(r#"{"key":"ftp","count":9}"#).unwrap();
        assert!(ssh < ftp);

        assert!(json.contains(r#""last_days_report1""#));
        assert!(json.contains(r#""last_days_report2""#));
        // absent insight is omitted entirely
        assert!(!json.contains("insight"));
    }

    #[test]
    fn test_json_round_trip() {
        let mut report = sample_report();
        report.insight = Some("volume doubled".to_string());

        let bytes = render_json(&report).unwrap();
        let decoded: Report = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn test_html_structure() {
        let html = render_html(&sample_report(), 7, 30);

        let ftp = html.find("• ftp: 9").unwrap();
        let ssh = html.find("• ssh: 5").unwrap();
        assert!(ftp < ssh);

        assert!(html.starts_with("<h3>Generated Report</h3>"));
        assert!(html.contains(&format!("<a href=\"{PROJECT_URL}\">banlog</a>")));
        assert!(!html.contains("<h4>Insights</h4>"));
    }

    #[test]
    fn test_html_appends_insight_block() {
        let mut report = sample_report();
        report.insight = Some("spike from a single subnet".to_string());

        let html = render_html(&report, 7, 30);
        assert!(html.contains("<h4>Insights</h4>"));
        assert!(html.contains(&format!(
            "<i>insights generated by <strong>{GOOGLE_AI_MODEL}</strong></i>"
        )));
    }

    #[test]
    fn test_counts_block_tie_break() {
        let counts = CountTable::from_entries(vec![
            CountEntry {
                key: "ssh".to_string(),
                count: 3,
            },
            CountEntry {
                key: "telnet".to_string(),
                count: 3,
            },
        ]);
        assert_eq!(counts_block(&counts, "  "), "  ssh: 3\n  telnet: 3");
    }
}
