//! Maven version comparison and version-text classification.

use std::cmp::Ordering;

const RANGE_DELIMITERS: [char; 5] = ['[', ']', '(', ')', ','];

/// Returns true for a pinned (non-range) version constraint.
///
/// A soft version is free of the range delimiters `[ ] ( ) ,`.
pub fn is_soft(version: &str) -> bool {
    !version.contains(RANGE_DELIMITERS)
}

/// Returns true if the version text references a property, e.g. `${junit.version}`.
pub fn is_property_ref(version: &str) -> bool {
    property_name(version).is_some()
}

/// Extracts `name` from a `${name}` reference.
pub fn property_name(token: &str) -> Option<&str> {
    token
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

/// Compares two Maven version strings.
///
/// Splits on `.` and `-`, compares numeric segments numerically,
/// string segments lexicographically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = split_version(a);
    let b_parts = split_version(b);

    let max_len = a_parts.len().max(b_parts.len());
    for i in 0..max_len {
        let ap = a_parts.get(i).copied().unwrap_or("");
        let bp = b_parts.get(i).copied().unwrap_or("");

        let ord = compare_segment(ap, bp);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

/// Sorts versions newest-first and drops duplicates.
pub fn sort_newest_first(versions: &mut Vec<String>) {
    versions.sort_by(|a, b| compare_versions(b, a));
    versions.dedup();
}

fn split_version(v: &str) -> Vec<&str> {
    v.split(['.', '-']).filter(|s| !s.is_empty()).collect()
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(an), Ok(bn)) => an.cmp(&bn),
        // A missing segment sorts below a present numeric one: 1.0 < 1.0.1
        (Err(_), Ok(_)) if a.is_empty() => Ordering::Less,
        (Ok(_), Err(_)) if b.is_empty() => Ordering::Greater,
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_versions() {
        assert!(is_soft("1.2.3"));
        assert!(is_soft("33.0.0-jre"));
        assert!(is_soft("${guava.version}"));
        assert!(!is_soft("[1.2.3,1.3.0]"));
        assert!(!is_soft("(,2.0)"));
        assert!(!is_soft("[1.0]"));
    }

    #[test]
    fn test_property_refs() {
        assert!(is_property_ref("${project.version}"));
        assert_eq!(property_name("${slf4j.version}"), Some("slf4j.version"));
        assert_eq!(property_name("1.0"), None);
        assert_eq!(property_name("${}"), None);
        assert_eq!(property_name("${unterminated"), None);
    }

    #[test]
    fn test_version_comparison() {
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.1", "1.0.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("10.0.0", "9.0.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut versions = vec![
            "2.15.0".to_string(),
            "2.16.1".to_string(),
            "2.9.0".to_string(),
            "2.16.1".to_string(),
        ];
        sort_newest_first(&mut versions);
        assert_eq!(versions, vec!["2.16.1", "2.15.0", "2.9.0"]);
    }
}
