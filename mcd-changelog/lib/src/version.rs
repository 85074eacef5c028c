//! Release version strings of the form `x.y.z`.
//!
//! The changelog publishes bare numeric triples. Ordering is numeric per
//! component, so `1.10.0` sorts after `1.9.0` even though plain string
//! comparison says otherwise.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a version string is not three dot-separated integers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Version '{0}' is not in the form x.y.z, where x, y and z are integers")]
pub struct MalformedVersion(pub String);

/// A validated `x.y.z` release version.
///
/// The original text is kept as published (it is spliced back into artifact
/// URLs), while comparisons go through the parsed numeric components.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion {
    raw: String,
    numeric: semver::Version,
}

impl ReleaseVersion {
    /// Parses a version string.
    ///
    /// ## Errors
    ///
    /// Returns [`MalformedVersion`] unless the input is exactly three
    /// non-empty, all-digit components separated by `.`. Prefixes such as
    /// `v1.0.0` and suffixes such as `1.0.0-rc.1` are rejected.
    ///
    /// ## Examples
    ///
    /// ```
    /// use mcd_changelog_lib::version::ReleaseVersion;
    ///
    /// let newer = ReleaseVersion::parse("1.10.0").unwrap();
    /// let older = ReleaseVersion::parse("1.9.0").unwrap();
    /// assert!(newer > older);
    /// assert!(ReleaseVersion::parse("v1.0.0").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, MalformedVersion> {
        let malformed = || MalformedVersion(s.to_string());

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(malformed());
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            *slot = part.parse().map_err(|_| malformed())?;
        }

        Ok(Self {
            raw: s.to_string(),
            numeric: semver::Version::new(numbers[0], numbers[1], numbers[2]),
        })
    }

    /// The version exactly as it appeared in the changelog.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> u64 {
        self.numeric.major
    }

    pub fn minor(&self) -> u64 {
        self.numeric.minor
    }

    pub fn patch(&self) -> u64 {
        self.numeric.patch
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // `1.01.0` and `1.1.0` are numerically equal; fall back to the text so
        // the ordering stays consistent with `Eq`.
        self.numeric
            .cmp(&other.numeric)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ReleaseVersion {}

impl std::hash::Hash for ReleaseVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ReleaseVersion {
    type Err = MalformedVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = MalformedVersion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReleaseVersion> for String {
    fn from(value: ReleaseVersion) -> Self {
        value.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> ReleaseVersion {
        ReleaseVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_valid() {
        let version = v("1.0.4");
        assert_eq!(version.as_str(), "1.0.4");
        assert_eq!((version.major(), version.minor(), version.patch()), (1, 0, 4));
    }

    #[test]
    fn test_parse_rejects_wrong_component_count() {
        assert!(ReleaseVersion::parse("1.0").is_err());
        assert!(ReleaseVersion::parse("1.0.0.0").is_err());
        assert!(ReleaseVersion::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        for bad in ["v1.0.0", "1.0.0-rc.1", "1.x.0", "1..0", "+1.0.0", " 1.0.0", "1.0.0/"] {
            let err = ReleaseVersion::parse(bad).unwrap_err();
            assert_eq!(err, MalformedVersion(bad.to_string()), "{bad}");
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(ReleaseVersion::parse("99999999999999999999.0.0").is_err());
    }

    #[test]
    fn test_multi_digit_component_ordering() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("1.0.10") > v("1.0.4"));
        assert!(v("10.0.0") > v("9.99.99"));
        // Plain string comparison gets these wrong.
        assert!("1.10.0" < "1.9.0");
    }

    #[test]
    fn test_leading_zeros_keep_raw_text() {
        let padded = v("1.01.0");
        assert_eq!(padded.as_str(), "1.01.0");
        assert_ne!(padded, v("1.1.0"));
        assert_ne!(padded.cmp(&v("1.1.0")), Ordering::Equal);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&v("1.2.3")).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let back: ReleaseVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2.3"));
        assert!(serde_json::from_str::<ReleaseVersion>("\"v1.2.3\"").is_err());
    }

    proptest! {
        #[test]
        fn ordering_matches_numeric_tuples(
            a in (0u64..200, 0u64..200, 0u64..200),
            b in (0u64..200, 0u64..200, 0u64..200),
        ) {
            let va = v(&format!("{}.{}.{}", a.0, a.1, a.2));
            let vb = v(&format!("{}.{}.{}", b.0, b.1, b.2));
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }
    }
}
