use regex::Regex;
use std::sync::LazyLock;

/// Dotted-quad shape check, compiled once. The pattern is a constant, so
/// a compile failure is a programming error, not a runtime condition.
static IPV4_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").expect("valid IPv4 shape pattern")
});

/// Percentage of sampled values carrying a usable geolocation entry.
///
/// A value counts when it is present, non-empty, and not the literal
/// "unknown" placeholder the ingest pipeline writes for failed lookups.
/// The figure describes only the sampled page of rows, never the full
/// table.
pub fn coverage_percent<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut total = 0usize;
    let mut covered = 0usize;

    for value in values {
        total += 1;
        if has_geo_value(value) {
            covered += 1;
        }
    }

    if total == 0 {
        return 0.0;
    }
    covered as f64 * 100.0 / total as f64
}

/// Whether a geolocation field holds a real value
pub fn has_geo_value(value: Option<&str>) -> bool {
    match value {
        Some(v) => {
            let trimmed = v.trim();
            !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("unknown")
        }
        None => false,
    }
}

/// Validates dotted-quad IPv4 format: four decimal octets, each 0-255
pub fn is_valid_ipv4(value: &str) -> bool {
    match IPV4_SHAPE.captures(value) {
        Some(caps) => (1..=4).all(|i| {
            caps[i]
                .parse::<u16>()
                .map(|octet| octet <= 255)
                .unwrap_or(false)
        }),
        None => false,
    }
}

/// Counts values that pass IPv4 format validation
pub fn count_valid_ipv4<'a, I>(values: I) -> usize
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .filter(|v| v.map(is_valid_ipv4).unwrap_or(false))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_percent() {
        // 10 sampled rows, 3 with a usable country value
        let values: Vec<Option<&str>> = vec![
            Some("DE"),
            Some("unknown"),
            None,
            Some("US"),
            Some(""),
            None,
            Some("  "),
            Some("FR"),
            Some("Unknown"),
            None,
        ];
        assert_eq!(coverage_percent(values), 30.0);
    }

    #[test]
    fn test_coverage_percent_empty_sample() {
        assert_eq!(coverage_percent(Vec::<Option<&str>>::new()), 0.0);
    }

    #[test]
    fn test_has_geo_value() {
        assert!(has_geo_value(Some("Berlin")));
        assert!(!has_geo_value(Some("unknown")));
        assert!(!has_geo_value(Some("UNKNOWN")));
        assert!(!has_geo_value(Some("")));
        assert!(!has_geo_value(None));
    }

    #[test]
    fn test_is_valid_ipv4() {
        assert!(is_valid_ipv4("192.168.1.1"));
        assert!(is_valid_ipv4("0.0.0.0"));
        assert!(is_valid_ipv4("255.255.255.255"));

        assert!(!is_valid_ipv4("999.1.1"));
        assert!(!is_valid_ipv4("abc.def.ghi.jkl"));
        assert!(!is_valid_ipv4("256.1.1.1"));
        assert!(!is_valid_ipv4("1.2.3"));
        assert!(!is_valid_ipv4("1.2.3.4.5"));
        assert!(!is_valid_ipv4(""));
    }

    #[test]
    fn test_count_valid_ipv4() {
        let values = vec![
            Some("10.0.0.1"),
            Some("999.1.1"),
            None,
            Some("172.16.0.254"),
        ];
        assert_eq!(count_valid_ipv4(values), 2);
    }
}
