//! Heuristic anomaly detection for extracted report content.
//!
//! Four keyword families are scanned against the lower-cased text (the energy
//! family against column headers), followed by a numeric-density check.
//! Detection is total: every input produces a [`Finding`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::document::DocumentMetadata;

/// Numbers strictly above this value count as "large".
pub const LARGE_NUMBER_THRESHOLD: f64 = 1000.0;

/// More than this many large numbers triggers the numeric-density issue.
pub const MIN_LARGE_NUMBERS_COUNT: usize = 3;

const WASTE_KEYWORDS: &[&str] = &["waste", "inefficiency", "loss", "leak", "spillage"];
const HIGH_CONSUMPTION_KEYWORDS: &[&str] =
    &["high consumption", "above baseline", "excessive", "over limit"];
const EMERGENCY_KEYWORDS: &[&str] = &["urgent", "critical", "emergency", "alert", "failure"];
const ENERGY_HEADER_KEYWORDS: &[&str] = &["energy", "consumption", "kwh", "power", "usage"];

/// Matches the same tokens as `\d+\.?\d*` restricted to ASCII digits.
static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+\.?[0-9]*").unwrap());

/// Finding severity. Ordered so that escalation is `max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One heuristic that contributes at most one issue line.
struct Rule {
    issue: &'static str,
    recommendation: &'static str,
    /// Severity floor implied by a match; `None` leaves severity untouched.
    severity: Option<Severity>,
}

const WASTE_RULE: Rule = Rule {
    issue: "Waste management concerns detected",
    recommendation: "Review waste reduction strategies",
    severity: Some(Severity::Medium),
};

const HIGH_CONSUMPTION_RULE: Rule = Rule {
    issue: "High energy/resource consumption identified",
    recommendation: "Investigate consumption patterns and optimize systems",
    severity: Some(Severity::High),
};

const EMERGENCY_RULE: Rule = Rule {
    issue: "Critical environmental issue requiring immediate attention",
    recommendation: "Immediate investigation and corrective action required",
    severity: Some(Severity::High),
};

const ENERGY_HEADERS_RULE: Rule = Rule {
    issue: "Energy consumption data detected for analysis",
    recommendation: "Monitor for consumption patterns and optimization opportunities",
    severity: None,
};

const NUMERIC_DENSITY_RULE: Rule = Rule {
    issue: "High numerical values detected - potential consumption spikes",
    recommendation: "Review high-value entries for efficiency opportunities",
    severity: Some(Severity::Medium),
};

/// Classified result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Finding {
    detected: bool,
    severity: Severity,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl Finding {
    /// A finding with nothing detected.
    pub fn none() -> Self {
        Self::default()
    }

    fn from_parts(severity: Severity, issues: Vec<String>, recommendations: Vec<String>) -> Self {
        Self {
            detected: !issues.is_empty(),
            severity: if issues.is_empty() {
                Severity::Low
            } else {
                severity
            },
            issues,
            recommendations,
        }
    }

    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Build the escalated finding used by the crisis simulation.
    ///
    /// Returns a new high-severity finding that leads with the crisis issues,
    /// keeps at most five issues and four recommendations, and leaves `self`
    /// untouched.
    pub fn crisis_override(&self) -> Self {
        let issues = [
            "CRITICAL FAILURE detected in multiple units",
            "EMERGENCY LEAK - consumption above 5000 kWh",
        ]
        .into_iter()
        .map(str::to_string)
        .chain(self.issues.iter().cloned())
        .take(5)
        .collect();

        let recommendations = [
            "Immediate shutdown of affected systems",
            "Deploy emergency response team",
        ]
        .into_iter()
        .map(str::to_string)
        .chain(self.recommendations.iter().cloned())
        .take(4)
        .collect();

        Self::from_parts(Severity::High, issues, recommendations)
    }
}

/// Accumulates rule matches; severity only ever moves up.
#[derive(Default)]
struct FindingBuilder {
    severity: Severity,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl FindingBuilder {
    fn apply(&mut self, rule: &Rule) {
        self.issues.push(rule.issue.to_string());
        self.recommendations.push(rule.recommendation.to_string());
        if let Some(floor) = rule.severity {
            self.severity = self.severity.max(floor);
        }
    }

    fn build(self) -> Finding {
        Finding::from_parts(self.severity, self.issues, self.recommendations)
    }
}

/// Score extracted content for anomalies.
pub fn detect(text: &str, metadata: &DocumentMetadata) -> Finding {
    let lower = text.to_lowercase();
    let mut finding = FindingBuilder::default();

    if contains_any(&lower, WASTE_KEYWORDS) {
        finding.apply(&WASTE_RULE);
    }

    if contains_any(&lower, HIGH_CONSUMPTION_KEYWORDS) {
        finding.apply(&HIGH_CONSUMPTION_RULE);
    }

    if contains_any(&lower, EMERGENCY_KEYWORDS) {
        finding.apply(&EMERGENCY_RULE);
    }

    if metadata
        .headers()
        .iter()
        .any(|header| contains_any(&header.to_lowercase(), ENERGY_HEADER_KEYWORDS))
    {
        finding.apply(&ENERGY_HEADERS_RULE);
    }

    if count_large_numbers(text) > MIN_LARGE_NUMBERS_COUNT {
        finding.apply(&NUMERIC_DENSITY_RULE);
    }

    finding.build()
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

/// Counts numeric tokens above [`LARGE_NUMBER_THRESHOLD`].
///
/// Dates, identifiers and currency amounts are counted like any other number.
fn count_large_numbers(text: &str) -> usize {
    NUMBER_TOKEN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| *value > LARGE_NUMBER_THRESHOLD)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_metadata() -> DocumentMetadata {
        DocumentMetadata::default()
    }

    fn headers(names: &[&str]) -> DocumentMetadata {
        DocumentMetadata {
            headers: Some(names.iter().map(|h| h.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_text() {
        let finding = detect("", &no_metadata());
        assert!(!finding.detected());
        assert_eq!(finding.severity(), Severity::Low);
        assert!(finding.issues().is_empty());
        assert!(finding.recommendations().is_empty());
    }

    #[test]
    fn test_clean_text_is_not_detected() {
        let finding = detect(
            "Quarterly report: 120 units shipped, 3 sites audited in 2023.",
            &no_metadata(),
        );
        assert!(!finding.detected());
        assert!(finding.issues().is_empty());
    }

    #[test]
    fn test_three_large_numbers_is_not_enough() {
        let finding = detect("readings 1500 2500 3500 and 999", &no_metadata());
        assert!(!finding.detected());
    }

    #[test]
    fn test_four_large_numbers_escalate_to_medium() {
        let finding = detect("readings 1500 2500.5 3500 4500", &no_metadata());
        assert!(finding.detected());
        assert_eq!(finding.severity(), Severity::Medium);
        assert_eq!(finding.issues(), [NUMERIC_DENSITY_RULE.issue]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let finding = detect("1000 1000 1000 1000 1000", &no_metadata());
        assert!(!finding.detected());
    }

    #[test]
    fn test_waste_is_medium() {
        let finding = detect("Minor spillage near tank 4", &no_metadata());
        assert_eq!(finding.severity(), Severity::Medium);
        assert_eq!(finding.issues(), [WASTE_RULE.issue]);
        assert_eq!(finding.recommendations(), [WASTE_RULE.recommendation]);
    }

    #[test]
    fn test_family_contributes_one_issue() {
        let finding = detect("waste, leak, spillage and more waste", &no_metadata());
        assert_eq!(finding.issues().len(), 1);
        assert_eq!(finding.recommendations().len(), 1);
    }

    #[test]
    fn test_emergency_is_always_high() {
        for text in [
            "URGENT",
            "pump failure",
            "waste leak with critical pressure",
            "1500 2500 3500 4500 emergency",
        ] {
            assert_eq!(detect(text, &no_metadata()).severity(), Severity::High, "{text}");
        }
    }

    #[test]
    fn test_numeric_density_never_downgrades_high() {
        let finding = detect("excessive draw: 1500 2500 3500 4500", &no_metadata());
        assert_eq!(finding.severity(), Severity::High);
        assert_eq!(finding.issues().len(), 2);
    }

    #[test]
    fn test_energy_headers_do_not_change_severity() {
        let finding = detect("all nominal", &headers(&["site", "Energy_kWh"]));
        assert!(finding.detected());
        assert_eq!(finding.severity(), Severity::Low);
        assert_eq!(finding.issues(), [ENERGY_HEADERS_RULE.issue]);
    }

    #[test]
    fn test_headers_are_not_scanned_for_other_families() {
        let finding = detect("all nominal", &headers(&["waste_kg"]));
        assert!(!finding.detected());
    }

    #[test]
    fn test_severity_is_monotone() {
        let base = "routine leak inspection";
        let extended = "routine leak inspection, consumption above baseline, alert raised";
        let smaller = detect(base, &no_metadata());
        let larger = detect(extended, &no_metadata());
        assert!(larger.severity() >= smaller.severity());
        assert!(larger.issues().len() > smaller.issues().len());
    }

    #[test]
    fn test_issue_order_follows_heuristics() {
        let finding = detect(
            "CRITICAL FAILURE: consumption 5000 above baseline",
            &headers(&["energy_kwh"]),
        );
        assert!(finding.detected());
        assert_eq!(finding.severity(), Severity::High);
        assert_eq!(
            finding.issues(),
            [
                HIGH_CONSUMPTION_RULE.issue,
                EMERGENCY_RULE.issue,
                ENERGY_HEADERS_RULE.issue
            ]
        );
    }

    #[test]
    fn test_crisis_override_builds_new_finding() {
        let original = detect("minor waste", &no_metadata());
        let crisis = original.crisis_override();

        assert_eq!(original.severity(), Severity::Medium);
        assert_eq!(original.issues().len(), 1);

        assert!(crisis.detected());
        assert_eq!(crisis.severity(), Severity::High);
        assert_eq!(crisis.issues()[0], "CRITICAL FAILURE detected in multiple units");
        assert_eq!(crisis.issues().len(), 3);
        assert_eq!(crisis.recommendations().len(), 3);
    }

    #[test]
    fn test_crisis_override_caps_lists() {
        let original = detect(
            "waste excessive critical 1500 2500 3500 4500",
            &headers(&["power"]),
        );
        assert_eq!(original.issues().len(), 5);

        let crisis = original.crisis_override();
        assert_eq!(crisis.issues().len(), 5);
        assert_eq!(crisis.recommendations().len(), 4);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        assert!(Severity::Low < Severity::Medium && Severity::Medium < Severity::High);
    }
}
