//! Prometheus text exposition parser used when the query API is unavailable.
//!
//! Only metric names and label values are extracted. `# HELP` / `# TYPE`
//! comments are skipped with every other comment, so types are left to the
//! classifier's inference.

use std::collections::BTreeMap;

use crate::discovery::types::DiscoveredMetric;

/// Parse exposition text. When `filter` is `Some((label, value))`, only sample
/// lines containing the literal `label="value"` are kept.
pub fn parse(text: &str, filter: Option<(&str, &str)>) -> Vec<DiscoveredMetric> {
    let needle = filter.map(|(label, value)| format!("{}=\"{}\"", label, value));
    let mut metrics: BTreeMap<String, DiscoveredMetric> = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(needle) = &needle {
            if !line.contains(needle.as_str()) {
                continue;
            }
        }
        let Some(name) = metric_name(line) else {
            continue;
        };
        let entry = metrics
            .entry(name.to_string())
            .or_insert_with(|| DiscoveredMetric::new(name));
        for (label, value) in labels(line) {
            entry.labels.entry(label).or_default().insert(value);
        }
    }

    metrics.into_values().collect()
}

/// Token before `{` or the first whitespace.
fn metric_name(line: &str) -> Option<&str> {
    let end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..end];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    valid.then_some(name)
}

/// Label pairs between the first `{` and its closing `}`. Malformed label
/// blocks yield whatever pairs were read before the damage.
fn labels(line: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let Some(open) = line.find('{') else {
        return pairs;
    };
    let mut chars = line[open + 1..].chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == '}' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.next() != Some('=') || chars.next() != Some('"') {
            return pairs;
        }
        let mut value = String::new();
        loop {
            match chars.next() {
                Some('\\') => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some(c) => value.push(c),
                    None => return pairs,
                },
                Some('"') => break,
                Some(c) => value.push(c),
                None => return pairs,
            }
        }
        pairs.push((key.trim().to_string(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# HELP http_requests_total Total requests.
# TYPE http_requests_total counter
http_requests_total{service="payment-api",status="200"} 1027
http_requests_total{service="payment-api",status="503"} 3
http_requests_total{service="ledger",status="200"} 88

pg_up{service="payment-api"} 1
process_start_time_seconds 1.7e9
"#;

    #[test]
    fn test_parse_all() {
        let metrics = parse(SAMPLE, None);
        let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["http_requests_total", "pg_up", "process_start_time_seconds"]);
        let statuses = &metrics[0].labels["status"];
        assert_eq!(statuses.len(), 2);
        assert_eq!(metrics[0].labels["service"].len(), 2);
    }

    #[test]
    fn test_service_filter() {
        let metrics = parse(SAMPLE, Some(("service", "payment-api")));
        let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["http_requests_total", "pg_up"]);
        assert_eq!(metrics[0].labels["service"].len(), 1);
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let metrics = parse("<html>oops</html>\n{broken} 1\nok_metric 1\n", None);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, "ok_metric");
    }

    #[test]
    fn test_escaped_label_values() {
        let metrics = parse(r#"m{path="/a\"b",x="y"} 1"#, None);
        assert!(metrics[0].labels["path"].contains("/a\"b"));
        assert!(metrics[0].labels["x"].contains("y"));
    }
}
