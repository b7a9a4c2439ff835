//! Gauge exposition-line parser
//!
//! The gearsmith scrapes peer beacons as plain text and extracts the two
//! pressure gauges by line prefix. Non-matching lines and unparsable values
//! are skipped; a scrape never fails on a single bad line.

use tracing::warn;

/// The gauge kinds a beacon exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GaugeKind {
    GreaseBuildup,
    InkDepletion,
}

impl GaugeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GaugeKind::GreaseBuildup => "greasebuildup",
            GaugeKind::InkDepletion => "inkdepletion",
        }
    }
}

/// One extracted gauge reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeValue {
    pub kind: GaugeKind,
    pub value: f64,
}

/// Known exposition-line prefixes; the greasefactor form is the legacy gauge
/// naming scheme and maps onto grease buildup.
const PREFIXES: &[(&str, GaugeKind)] = &[
    ("genteelbeacon_greasebuildup_p", GaugeKind::GreaseBuildup),
    ("genteelbeacon_inkdepletion_p", GaugeKind::InkDepletion),
    ("genteelbeacon_greasefactor_p", GaugeKind::GreaseBuildup),
];

/// Parse a single exposition line into a typed gauge reading
///
/// Returns `None` for non-matching lines and for matching lines whose
/// numeric suffix does not parse (logged at warning level).
pub fn parse_gauge_line(line: &str) -> Option<GaugeValue> {
    for (prefix, kind) in PREFIXES {
        if let Some(rest) = line.strip_prefix(prefix) {
            // Skip HELP/TYPE comments and labelled series of the same family
            if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == '{') {
                continue;
            }
            return match rest.trim().parse::<f64>() {
                Ok(value) => Some(GaugeValue { kind: *kind, value }),
                Err(_) => {
                    warn!(line, "Could not parse gauge value");
                    None
                }
            };
        }
    }
    None
}

/// Scan a whole response body for gauge readings
pub fn scan_gauges(body: &str) -> Vec<GaugeValue> {
    body.lines().filter_map(parse_gauge_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grease_line() {
        let parsed = parse_gauge_line("genteelbeacon_greasebuildup_p 42").unwrap();
        assert_eq!(parsed.kind, GaugeKind::GreaseBuildup);
        assert_eq!(parsed.value, 42.0);
    }

    #[test]
    fn test_parse_ink_line() {
        let parsed = parse_gauge_line("genteelbeacon_inkdepletion_p 17.5").unwrap();
        assert_eq!(parsed.kind, GaugeKind::InkDepletion);
        assert_eq!(parsed.value, 17.5);
    }

    #[test]
    fn test_parse_legacy_greasefactor_line() {
        let parsed = parse_gauge_line("genteelbeacon_greasefactor_p 3").unwrap();
        assert_eq!(parsed.kind, GaugeKind::GreaseBuildup);
        assert_eq!(parsed.value, 3.0);
    }

    #[test]
    fn test_whitespace_around_value_is_trimmed() {
        let parsed = parse_gauge_line("genteelbeacon_greasebuildup_p   8  ").unwrap();
        assert_eq!(parsed.value, 8.0);
    }

    #[test]
    fn test_non_matching_line_is_skipped() {
        assert!(parse_gauge_line("process_cpu_seconds_total 1.5").is_none());
        assert!(parse_gauge_line("").is_none());
    }

    #[test]
    fn test_unparsable_value_is_skipped() {
        assert!(parse_gauge_line("genteelbeacon_greasebuildup_p not-a-number").is_none());
    }

    #[test]
    fn test_help_and_type_comments_are_skipped() {
        let body = "\
# HELP genteelbeacon_greasebuildup_p The Genteel Beacon's current grease buildup
# TYPE genteelbeacon_greasebuildup_p gauge
genteelbeacon_greasebuildup_p 5
genteelbeacon_inkdepletion_p 9
go_goroutines 12
";
        let gauges = scan_gauges(body);
        assert_eq!(gauges.len(), 2);
        assert_eq!(
            gauges[0],
            GaugeValue {
                kind: GaugeKind::GreaseBuildup,
                value: 5.0
            }
        );
        assert_eq!(
            gauges[1],
            GaugeValue {
                kind: GaugeKind::InkDepletion,
                value: 9.0
            }
        );
    }

    #[test]
    fn test_longer_metric_names_do_not_match_prefix() {
        // A different metric sharing the prefix must not be misread
        assert!(parse_gauge_line("genteelbeacon_greasebuildup_percent 3").is_none());
    }
}
