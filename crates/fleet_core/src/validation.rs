/// Validates a cluster name per SPEC_FULL §3: a DNS label, 1-63 chars, lowercase
/// alphanumeric and hyphen, not starting or ending with a hyphen.
pub fn is_valid_cluster_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }
    let bytes = name.as_bytes();
    if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(is_valid_cluster_name("prod-a"));
        assert!(is_valid_cluster_name("a"));
        assert!(is_valid_cluster_name("cluster-01"));
    }

    #[test]
    fn rejects_empty() {
        assert!(!is_valid_cluster_name(""));
    }

    #[test]
    fn rejects_too_long() {
        let name = "a".repeat(64);
        assert!(!is_valid_cluster_name(&name));
    }

    #[test]
    fn rejects_uppercase() {
        assert!(!is_valid_cluster_name("Prod-A"));
    }

    #[test]
    fn rejects_leading_or_trailing_hyphen() {
        assert!(!is_valid_cluster_name("-prod"));
        assert!(!is_valid_cluster_name("prod-"));
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(!is_valid_cluster_name("prod_a"));
        assert!(!is_valid_cluster_name("prod.a"));
    }
}
