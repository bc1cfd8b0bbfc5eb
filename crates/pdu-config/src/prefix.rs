use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ConfigError;

/// Path prefix the HTTP routes are mounted under.
///
/// Always begins with `/` and never ends with one, so `/pdu/` and `/pdu`
/// describe the same mount point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlPrefix(String);

impl UrlPrefix {
    /// Validates and normalises `raw`.
    ///
    /// Returns `Ok(None)` for an empty value or a bare `/`, both meaning
    /// "mount at the root".
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrlPrefix`] when the value does not start
    /// with `/` or contains characters that cannot appear in a path.
    pub fn parse(raw: &str) -> Result<Option<Self>, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if !trimmed.starts_with('/') {
            return Err(invalid(raw, "must start with '/'"));
        }
        if trimmed
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '?' | '#'))
        {
            return Err(invalid(raw, "must be a plain path"));
        }
        let normalised = trimmed.trim_end_matches('/');
        if normalised.is_empty() {
            return Ok(None);
        }
        if normalised.contains("//") {
            return Err(invalid(raw, "must not contain empty segments"));
        }
        Ok(Some(Self(normalised.to_owned())))
    }

    /// The normalised prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid(raw: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidUrlPrefix {
        prefix: raw.to_owned(),
        reason,
    }
}

impl fmt::Display for UrlPrefix {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl Serialize for UrlPrefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UrlPrefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .map_err(serde::de::Error::custom)?
            .ok_or_else(|| serde::de::Error::custom("url prefix must not be empty"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/pdu", "/pdu")]
    #[case("/pdu/", "/pdu")]
    #[case("/api/v2///", "/api/v2")]
    fn normalises_trailing_slashes(#[case] raw: &str, #[case] expected: &str) {
        let prefix = UrlPrefix::parse(raw)
            .expect("valid prefix")
            .expect("non-empty prefix");
        assert_eq!(prefix.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    fn root_prefixes_collapse_to_none(#[case] raw: &str) {
        assert!(UrlPrefix::parse(raw).expect("valid prefix").is_none());
    }

    #[rstest]
    #[case("pdu")]
    #[case("/p du")]
    #[case("/pdu?x=1")]
    #[case("//pdu")]
    fn rejects_malformed_prefixes(#[case] raw: &str) {
        let error = UrlPrefix::parse(raw).expect_err("prefix should be rejected");
        assert!(matches!(error, ConfigError::InvalidUrlPrefix { .. }));
    }
}
