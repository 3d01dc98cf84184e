//! Denylist storage and the hierarchical name matcher.
//!
//! The set holds lowercase bare hostnames. A queried name matches if the
//! normalized name itself or any parent suffix (at label boundaries) is in
//! the set, so an entry for `example.com` also catches `ads.example.com`.

use std::path::Path;

use rustc_hash::FxHashSet;
use tracing::{info, warn};

use crate::error::DnsError;

/// Produce the lowercase bare hostname for an input that may carry URL
/// baggage: a scheme prefix, then anything from the first `/ ? : #` onward,
/// is dropped before lowercasing. Non-ASCII bytes pass through; wire names
/// are already A-labels.
pub fn normalize(input: &str) -> String {
    let host = match input.find("://") {
        Some(pos) => &input[pos + 3..],
        None => input,
    };
    let host = match host.find(['/', '?', ':', '#']) {
        Some(pos) => &host[..pos],
        None => host,
    };
    host.to_ascii_lowercase()
}

/// A set of denied domains, loaded once at startup and read-only after.
pub struct Blocklist {
    domains: FxHashSet<String>,
}

impl Blocklist {
    /// Load one domain per line from each file, lowercasing as we go.
    ///
    /// Missing files are skipped with a warning. Lines are inserted verbatim
    /// apart from lowercasing; comments and blanks become set members that
    /// never match a real query.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut domains = FxHashSet::default();
        for path in paths {
            let path = path.as_ref();
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    for line in text.lines() {
                        domains.insert(line.to_ascii_lowercase());
                    }
                }
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        "{}, skipping", DnsError::BlocklistFileNotFound
                    );
                }
            }
        }
        if domains.is_empty() {
            warn!("{}", DnsError::BlocklistEmpty);
        } else {
            info!(domains = domains.len(), "blocklist loaded");
        }
        Self { domains }
    }

    /// Check a queried name against the set and every parent suffix.
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        let normalized = normalize(name);
        let mut current = normalized.as_str();
        while !current.is_empty() {
            if self.domains.contains(current) {
                return true;
            }
            match current.find('.') {
                Some(pos) => current = &current[pos + 1..],
                None => return false,
            }
        }
        false
    }

    /// Number of entries in the set.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl FromIterator<String> for Blocklist {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let domains = iter.into_iter().map(|d| d.to_ascii_lowercase()).collect();
        Self { domains }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocklist(domains: &[&str]) -> Blocklist {
        domains.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn exact_match_is_blocked() {
        let blocklist = blocklist(&["doubleclick.net"]);

        assert!(blocklist.matches("doubleclick.net"));
    }

    #[test]
    fn subdomains_match_parent_entry() {
        let blocklist = blocklist(&["doubleclick.net"]);

        assert!(blocklist.matches("ads.doubleclick.net"));
        assert!(blocklist.matches("tracker.ads.doubleclick.net"));
    }

    #[test]
    fn parent_of_entry_does_not_match() {
        let blocklist = blocklist(&["ads.example.com"]);

        assert!(!blocklist.matches("example.com"));
        assert!(!blocklist.matches("com"));
    }

    #[test]
    fn suffix_must_sit_on_label_boundary() {
        let blocklist = blocklist(&["ads.com"]);

        assert!(!blocklist.matches("bads.com"));
        assert!(blocklist.matches("sub.ads.com"));
    }

    #[test]
    fn tld_entry_matches_everything_beneath_it() {
        let blocklist = blocklist(&["com"]);

        assert!(blocklist.matches("anything.com"));
        assert!(!blocklist.matches("anything.org"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let blocklist = blocklist(&["Doubleclick.NET"]);

        assert!(blocklist.matches("DOUBLECLICK.net"));
    }

    #[test]
    fn safe_domains_pass() {
        let blocklist = blocklist(&["doubleclick.net", "ads.com"]);

        assert!(!blocklist.matches("google.com"));
        assert!(!blocklist.matches("example.org"));
    }

    #[test]
    fn empty_input_never_matches() {
        let blocklist = blocklist(&["ads.com", ""]);

        assert!(!blocklist.matches(""));
    }

    #[test]
    fn normalize_strips_scheme() {
        assert_eq!(normalize("https://Example.com"), "example.com");
        assert_eq!(normalize("ftp://files.net"), "files.net");
    }

    #[test]
    fn normalize_strips_path_query_port_fragment() {
        assert_eq!(normalize("example.com/path?q=1"), "example.com");
        assert_eq!(normalize("example.com:8080"), "example.com");
        assert_eq!(normalize("example.com#anchor"), "example.com");
    }

    #[test]
    fn normalize_passes_plain_hostnames_through() {
        assert_eq!(normalize("sub.example.com"), "sub.example.com");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "https://Tracker.IO/ads?id=1#top",
            "a://b://c",
            "plain.example",
            "",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn matcher_normalizes_before_lookup() {
        let blocklist = blocklist(&["tracker.io"]);

        assert!(blocklist.matches("https://ads.Tracker.IO/pixel?id=1"));
    }

    #[test]
    fn duplicates_collapse() {
        let blocklist = blocklist(&["ads.com", "ads.com", "ADS.com"]);

        assert_eq!(blocklist.len(), 1);
    }

    #[test]
    fn files_load_lowercased_and_missing_ones_are_skipped() {
        let dir = std::env::temp_dir();
        let path = dir.join("sinkhole_blocklist_test.txt");
        std::fs::write(&path, "Ads.COM\n# comment\n\nTracker.io\n").unwrap();

        let blocklist =
            Blocklist::from_files(&[path.clone(), dir.join("sinkhole_no_such_list.txt")]);
        std::fs::remove_file(&path).unwrap();

        assert!(blocklist.matches("ads.com"));
        assert!(blocklist.matches("sub.tracker.io"));
        // The comment and blank line became inert members.
        assert_eq!(blocklist.len(), 4);
    }
}
