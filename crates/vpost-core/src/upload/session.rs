//! Upload session: validated metadata plus the file to send.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::SessionError;

/// Default category ("People & Blogs").
pub const DEFAULT_CATEGORY: &str = "22";

/// Visibility of the uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyStatus {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(PrivacyStatus::Public),
            "private" => Ok(PrivacyStatus::Private),
            "unlisted" => Ok(PrivacyStatus::Unlisted),
            other => Err(SessionError::InvalidPrivacy(other.to_string())),
        }
    }
}

/// Caller-supplied upload options, as they arrive from the CLI.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub file: PathBuf,
    pub title: String,
    pub description: String,
    /// Comma-separated keywords; `None` or empty means no tags.
    pub keywords: Option<String>,
    pub category: String,
    pub privacy: String,
}

/// Title, description, tags, category and privacy of the target video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Option<Vec<String>>,
    pub category: String,
    pub privacy_status: PrivacyStatus,
}

impl VideoMetadata {
    /// JSON resource body sent when the resumable session is opened.
    pub fn to_json(&self) -> serde_json::Value {
        let mut snippet = json!({
            "title": self.title,
            "description": self.description,
            "categoryId": self.category,
        });
        if let Some(tags) = &self.tags {
            snippet["tags"] = json!(tags);
        }
        json!({
            "snippet": snippet,
            "status": { "privacyStatus": self.privacy_status.as_str() },
        })
    }

    /// Resource parts named in the `part` query parameter.
    pub fn parts() -> &'static str {
        "snippet,status"
    }
}

/// Split a comma-separated keyword string into trimmed, non-empty tags.
/// Yields `None` when no tag remains.
pub fn parse_keywords(keywords: Option<&str>) -> Option<Vec<String>> {
    let tags: Vec<String> = keywords?
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    (!tags.is_empty()).then_some(tags)
}

/// Immutable description of one upload.
#[derive(Debug, Clone)]
pub struct UploadSession {
    resource_path: PathBuf,
    metadata: VideoMetadata,
}

impl UploadSession {
    /// Validate options and build a session. Fails before any network I/O.
    pub fn from_options(opts: UploadOptions) -> Result<Self, SessionError> {
        let privacy_status: PrivacyStatus = opts.privacy.parse()?;
        if opts.title.trim().is_empty() {
            return Err(SessionError::EmptyTitle);
        }
        if !opts.file.is_file() {
            return Err(SessionError::MissingFile(opts.file.display().to_string()));
        }
        let metadata = VideoMetadata {
            title: opts.title,
            description: opts.description,
            tags: parse_keywords(opts.keywords.as_deref()),
            category: opts.category,
            privacy_status,
        };
        Ok(Self {
            resource_path: opts.file,
            metadata,
        })
    }

    pub fn resource_path(&self) -> &Path {
        &self.resource_path
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(file: &Path, privacy: &str) -> UploadOptions {
        UploadOptions {
            file: file.to_path_buf(),
            title: "Night drive".to_string(),
            description: "style transfer test".to_string(),
            keywords: Some("lofi, night,drive".to_string()),
            category: DEFAULT_CATEGORY.to_string(),
            privacy: privacy.to_string(),
        }
    }

    #[test]
    fn private_privacy_accepted() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let s = UploadSession::from_options(options(f.path(), "private")).unwrap();
        assert_eq!(s.metadata().privacy_status, PrivacyStatus::Private);
        assert_eq!(s.resource_path(), f.path());
    }

    #[test]
    fn hidden_privacy_rejected() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let err = UploadSession::from_options(options(f.path(), "hidden")).unwrap_err();
        assert_eq!(err, SessionError::InvalidPrivacy("hidden".to_string()));
    }

    #[test]
    fn privacy_checked_before_file() {
        let err =
            UploadSession::from_options(options(Path::new("/nonexistent/x.mp4"), "Public"))
                .unwrap_err();
        assert!(matches!(err, SessionError::InvalidPrivacy(_)));
    }

    #[test]
    fn missing_file_rejected() {
        let err = UploadSession::from_options(options(Path::new("/nonexistent/x.mp4"), "public"))
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingFile(_)));
    }

    #[test]
    fn keywords_split_on_commas() {
        assert_eq!(
            parse_keywords(Some("lofi, night,drive")),
            Some(vec!["lofi".to_string(), "night".to_string(), "drive".to_string()])
        );
        assert_eq!(parse_keywords(Some("")), None);
        assert_eq!(
            parse_keywords(Some("a,,b, ")),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_keywords(Some(" , ,")), None);
        assert_eq!(parse_keywords(None), None);
    }

    #[test]
    fn body_has_snippet_and_status() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let s = UploadSession::from_options(options(f.path(), "unlisted")).unwrap();
        let body = s.metadata().to_json();
        assert_eq!(body["snippet"]["title"], "Night drive");
        assert_eq!(body["snippet"]["categoryId"], "22");
        assert_eq!(body["snippet"]["tags"][1], "night");
        assert_eq!(body["status"]["privacyStatus"], "unlisted");
    }

    #[test]
    fn body_omits_tags_when_absent() {
        let meta = VideoMetadata {
            title: "t".into(),
            description: String::new(),
            tags: None,
            category: DEFAULT_CATEGORY.into(),
            privacy_status: PrivacyStatus::Public,
        };
        let body = meta.to_json();
        assert!(body["snippet"].get("tags").is_none());
    }
}
