//! Container image references and tag resolution

use std::fmt;

/// Tag applied to every build regardless of revision
pub const LATEST_TAG: &str = "latest";

/// Length of the short revision identifier used as the second tag
pub const SHORT_TAG_LEN: usize = 7;

/// A (registry URI, tag) pair identifying a built container image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository_uri: String,
    pub tag: String,
}

impl ImageReference {
    pub fn new(repository_uri: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository_uri: repository_uri.into(),
            tag: tag.into(),
        }
    }

    /// The `latest` reference for a repository
    pub fn latest(repository_uri: impl Into<String>) -> Self {
        Self::new(repository_uri, LATEST_TAG)
    }

    /// Same repository, different tag
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self::new(self.repository_uri.clone(), tag)
    }

    /// Full pullable reference, `uri:tag`
    pub fn uri(&self) -> String {
        format!("{}:{}", self.repository_uri, self.tag)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository_uri, self.tag)
    }
}

/// Resolve the short content tag for a source revision.
///
/// The tag is the first [`SHORT_TAG_LEN`] characters of the revision identifier.
/// An empty, whitespace-only, or shorter-than-seven-character revision yields
/// [`LATEST_TAG`] instead of a truncated or empty tag.
pub fn revision_tag(revision: &str) -> String {
    let trimmed = revision.trim();
    if trimmed.chars().count() >= SHORT_TAG_LEN {
        trimmed.chars().take(SHORT_TAG_LEN).collect()
    } else {
        LATEST_TAG.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_tag_truncates_to_seven() {
        assert_eq!(revision_tag("a1b2c3d4e5f6"), "a1b2c3d");
    }

    #[test]
    fn test_revision_tag_exact_seven_kept() {
        assert_eq!(revision_tag("abcdef0"), "abcdef0");
    }

    #[test]
    fn test_revision_tag_short_falls_back_to_latest() {
        assert_eq!(revision_tag("abc123"), LATEST_TAG);
    }

    #[test]
    fn test_revision_tag_empty_falls_back_to_latest() {
        assert_eq!(revision_tag(""), LATEST_TAG);
        assert_eq!(revision_tag("   "), LATEST_TAG);
    }

    #[test]
    fn test_revision_tag_trims_newline_from_cli_output() {
        assert_eq!(revision_tag("a1b2c3d4e5f6\n"), "a1b2c3d");
    }

    #[test]
    fn test_revision_tag_stable_for_same_revision() {
        let first = revision_tag("0f45c2ea77d95a8a48d52c54237d8aae57e8b264");
        let second = revision_tag("0f45c2ea77d95a8a48d52c54237d8aae57e8b264");
        assert_eq!(first, second);
        assert_eq!(first, "0f45c2e");
    }

    #[test]
    fn test_image_reference_display() {
        let image = ImageReference::latest("123456789012.dkr.ecr.ap-northeast-1.amazonaws.com/app");
        assert_eq!(
            image.to_string(),
            "123456789012.dkr.ecr.ap-northeast-1.amazonaws.com/app:latest"
        );
        let tagged = image.with_tag("a1b2c3d");
        assert_eq!(
            tagged.uri(),
            "123456789012.dkr.ecr.ap-northeast-1.amazonaws.com/app:a1b2c3d"
        );
    }
}
