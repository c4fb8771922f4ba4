// gait-regress/src/junit.rs
// ============================================================================
// Module: JUnit Report
// Description: Renders a regression report as a JUnit XML test suite.
// Purpose: Implement `spec.md` §4.11's optional `junit.xml` output, one
// testcase per fixture, for CI consumption.
// Dependencies: none (hand-rolled XML; the corpus has no XML crate)
// ============================================================================

//! ## Overview
//! `gait-regress` has exactly one XML document to produce, with a fixed,
//! well-known shape (`<testsuite><testcase/>...</testsuite>`). No crate in
//! the workspace or the wider example pack pulls in an XML writer for a
//! single fixed document, so this renders it by hand with explicit entity
//! escaping rather than adding a dependency for one call site.

use crate::run::FixtureOutcome;
use crate::run::RegressReport;

/// Renders a [`RegressReport`] as a JUnit XML document.
#[must_use]
pub fn render(report: &RegressReport) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<testsuite name=\"gait-regress\" tests=\"{}\" failures=\"{}\">\n",
        report.outcomes.len(),
        report.outcomes.iter().filter(|outcome| !outcome.passed).count()
    ));
    for outcome in &report.outcomes {
        out.push_str(&render_testcase(outcome));
    }
    out.push_str("</testsuite>\n");
    out
}

fn render_testcase(outcome: &FixtureOutcome) -> String {
    let name = escape(&outcome.run_id);
    if outcome.passed {
        format!("  <testcase name=\"{name}\" classname=\"gait-regress\"/>\n")
    } else {
        let message = escape(&outcome.detail);
        format!(
            "  <testcase name=\"{name}\" classname=\"gait-regress\">\n    <failure message=\"{message}\"/>\n  </testcase>\n"
        )
    }
}

fn escape(text: &str) -> String {
    text.chars().fold(String::with_capacity(text.len()), |mut acc, ch| {
        match ch {
            '&' => acc.push_str("&amp;"),
            '<' => acc.push_str("&lt;"),
            '>' => acc.push_str("&gt;"),
            '"' => acc.push_str("&quot;"),
            '\'' => acc.push_str("&apos;"),
            other => acc.push(other),
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use crate::run::FixtureOutcome;
    use crate::run::RegressReport;

    use super::render;

    #[test]
    fn renders_one_testcase_per_outcome() {
        let report = RegressReport {
            outcomes: vec![
                FixtureOutcome { run_id: "run-1".to_string(), passed: true, detail: String::new(), context_drifts: vec![] },
                FixtureOutcome { run_id: "run-2".to_string(), passed: false, detail: "digest mismatch".to_string(), context_drifts: vec![] },
            ],
        };
        let xml = render(&report);
        assert!(xml.contains("tests=\"2\" failures=\"1\""));
        assert!(xml.contains("name=\"run-1\""));
        assert!(xml.contains("<failure message=\"digest mismatch\""));
    }

    #[test]
    fn escapes_special_characters_in_failure_messages() {
        let report = RegressReport {
            outcomes: vec![FixtureOutcome {
                run_id: "run-1".to_string(),
                passed: false,
                detail: "<mismatch & \"quoted\">".to_string(),
                context_drifts: vec![],
            }],
        };
        let xml = render(&report);
        assert!(xml.contains("&lt;mismatch &amp; &quot;quoted&quot;&gt;"));
    }
}
