//! Hostname to entry matching for autofill.
//!
//! This is a substring heuristic, not a registrable-domain match: a short
//! platform name such as "git" also matches "github.com".

use crate::vault::VaultRecord;

/// Lower-case the hostname and strip one leading `www.`.
pub fn normalize_hostname(hostname: &str) -> String {
    let host = hostname.trim().trim_end_matches('.').to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// Return the first entry, in list order, whose platform matches
/// `hostname`.
///
/// A platform matches when it and the normalized hostname contain one
/// another, or when `platform + ".com"` and the hostname contain one
/// another.
pub fn find_match<'a>(entries: &'a [VaultRecord], hostname: &str) -> Option<&'a VaultRecord> {
    let host = normalize_hostname(hostname);
    if host.is_empty() {
        return None;
    }
    entries.iter().find(|entry| platform_matches(&entry.platform, &host))
}

fn platform_matches(platform: &str, host: &str) -> bool {
    let platform = platform.trim().to_lowercase();
    // An empty platform is a substring of everything.
    if platform.is_empty() {
        return false;
    }
    let with_tld = format!("{platform}.com");
    contains_either_way(host, &platform) || contains_either_way(host, &with_tld)
}

fn contains_either_way(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, platform: &str) -> VaultRecord {
        VaultRecord {
            id: id.into(),
            platform: platform.into(),
            username: "user".into(),
            secret: "secret".into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn matches_plain_and_www_hosts() {
        let entries = vec![entry("1", "Github")];
        assert_eq!(find_match(&entries, "github.com").map(|e| &e.id), Some(&"1".to_string()));
        assert_eq!(find_match(&entries, "www.github.com").map(|e| &e.id), Some(&"1".to_string()));
        assert!(find_match(&entries, "example.com").is_none());
    }

    #[test]
    fn hostname_case_and_trailing_dot_are_ignored() {
        let entries = vec![entry("1", "Github")];
        assert!(find_match(&entries, "WWW.GitHub.COM.").is_some());
    }

    #[test]
    fn platform_with_tld_matches_bare_host() {
        // "github.com" contains the hostname "github".
        let entries = vec![entry("1", "Github")];
        assert!(find_match(&entries, "github").is_some());
    }

    #[test]
    fn platform_containing_host_matches() {
        let entries = vec![entry("1", "mail.google.com")];
        assert!(find_match(&entries, "google.com").is_some());
    }

    #[test]
    fn earliest_entry_wins() {
        let entries = vec![entry("first", "Git"), entry("second", "Github")];
        assert_eq!(find_match(&entries, "github.com").unwrap().id, "first");
    }

    #[test]
    fn short_platform_false_positive_is_kept() {
        let entries = vec![entry("1", "git")];
        assert!(find_match(&entries, "github.com").is_some());
    }

    #[test]
    fn only_a_leading_www_is_stripped() {
        let entries = vec![entry("1", "www")];
        // "www.example.org" normalizes to "example.org", which does not
        // contain "www" or "www.com".
        assert!(find_match(&entries, "www.example.org").is_none());
    }

    #[test]
    fn empty_inputs_never_match() {
        let entries = vec![entry("1", "   "), entry("2", "Github")];
        assert!(find_match(&entries, "").is_none());
        assert!(find_match(&entries, "www.").is_none());
        assert_eq!(find_match(&entries, "github.com").unwrap().id, "2");
        assert!(find_match(&[], "github.com").is_none());
    }
}
