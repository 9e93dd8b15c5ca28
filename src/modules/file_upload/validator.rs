use std::collections::HashSet;
use std::path::Path;

use crate::modules::file_upload::model::UploadConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Filename must not be empty")]
    EmptyName,
    #[error("Filename contains control characters")]
    ControlCharacters,
    #[error("Filename '{0}' contains a path traversal sequence")]
    PathTraversal(String),
    #[error("Filename has no extension")]
    MissingExtension,
    #[error("Extension '{0}' is not allowed")]
    ExtensionNotAllowed(String),
    #[error("Content type '{0}' is not allowed")]
    ContentTypeNotAllowed(String),
    #[error("Content type '{content_type}' does not match extension '{extension}'")]
    ContentTypeMismatch { extension: String, content_type: String },
    #[error("File size {size} exceeds maximum allowed size of {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("Declared size {declared} does not match received size {actual}")]
    SizeMismatch { declared: u64, actual: u64 },
}

impl ValidationError {
    /// Stable tag of the violated rule, returned to clients.
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::EmptyName
            | ValidationError::ControlCharacters
            | ValidationError::PathTraversal(_) => "name",
            ValidationError::MissingExtension | ValidationError::ExtensionNotAllowed(_) => {
                "extension"
            }
            ValidationError::ContentTypeNotAllowed(_) => "content_type",
            ValidationError::ContentTypeMismatch { .. } => "content_type_mismatch",
            ValidationError::TooLarge { .. } => "size",
            ValidationError::SizeMismatch { .. } => "size_mismatch",
        }
    }
}

/// Upload policy check run before any byte reaches storage.
#[derive(Debug, Clone)]
pub struct FileValidator {
    allowed_extensions: HashSet<String>,
    allowed_content_types: HashSet<String>,
    max_file_size: u64,
}

impl FileValidator {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            allowed_content_types: config
                .allowed_content_types
                .iter()
                .map(|t| normalize_content_type(t))
                .collect(),
            max_file_size: config.max_file_size,
        }
    }

    /// Checks, in order: name, extension, content type, size. Stops at the
    /// first violation.
    pub fn validate(
        &self,
        name: &str,
        declared_content_type: &str,
        size: u64,
        content_sample: &[u8],
    ) -> Result<(), ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.chars().any(char::is_control) {
            return Err(ValidationError::ControlCharacters);
        }
        if has_traversal(name) {
            return Err(ValidationError::PathTraversal(name.to_string()));
        }

        let extension = extension_of(name).ok_or(ValidationError::MissingExtension)?;
        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::ExtensionNotAllowed(extension));
        }

        let content_type = normalize_content_type(declared_content_type);
        if !self.allowed_content_types.contains(&content_type) {
            return Err(ValidationError::ContentTypeNotAllowed(content_type));
        }
        let guesses = mime_guess::from_ext(&extension);
        if !guesses.is_empty() && !guesses.iter().any(|m| m.essence_str() == content_type) {
            return Err(ValidationError::ContentTypeMismatch { extension, content_type });
        }

        let sampled = content_sample.len() as u64;
        if size > self.max_file_size || sampled > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size: size.max(sampled),
                max: self.max_file_size,
            });
        }

        Ok(())
    }
}

/// Lowercased extension of the last path segment, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?;
    Path::new(base)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Essence of a MIME type: parameters dropped, lowercased.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

fn has_traversal(name: &str) -> bool {
    if name.starts_with('/') || name.starts_with('\\') {
        return true;
    }
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }
    name.split(['/', '\\']).any(|segment| segment.trim() == "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> FileValidator {
        FileValidator::from_config(&UploadConfig {
            max_file_size: 1024,
            allowed_extensions: vec!["pdf".into(), ".TXT".into(), "png".into()],
            allowed_content_types: vec![
                "application/pdf".into(),
                "text/plain".into(),
                "image/png".into(),
            ],
            ..UploadConfig::default()
        })
    }

    #[test]
    fn accepts_allowed_file() {
        let v = validator();
        assert_eq!(v.validate("report.pdf", "application/pdf", 100, b"%PDF-1.7"), Ok(()));
        assert_eq!(v.validate("NOTES.TXT", "text/plain; charset=utf-8", 3, b"abc"), Ok(()));
    }

    #[test]
    fn rejects_empty_and_traversal_names() {
        let v = validator();
        assert_eq!(v.validate("  ", "text/plain", 1, b""), Err(ValidationError::EmptyName));
        for name in ["a\u{0}b.txt", "line\nbreak.txt", "bell\u{7}.txt"] {
            assert_eq!(v.validate(name, "text/plain", 3, b"abc"), Err(ValidationError::ControlCharacters));
        }
        for name in ["../../etc/passwd", "a/../b.txt", "/etc/hosts.txt", "C:\\x.txt", "..\\a.txt"] {
            let err = v.validate(name, "text/plain", 1, b"").unwrap_err();
            assert_eq!(err.rule(), "name", "{name}");
        }
    }

    #[test]
    fn rejects_missing_or_unknown_extension() {
        let v = validator();
        assert_eq!(v.validate("README", "text/plain", 1, b""), Err(ValidationError::MissingExtension));
        assert_eq!(
            v.validate("run.exe", "application/pdf", 1, b""),
            Err(ValidationError::ExtensionNotAllowed("exe".into()))
        );
    }

    #[test]
    fn rejects_content_type_outside_allow_list() {
        let v = validator();
        assert_eq!(
            v.validate("a.pdf", "application/zip", 1, b""),
            Err(ValidationError::ContentTypeNotAllowed("application/zip".into()))
        );
    }

    #[test]
    fn rejects_extension_and_content_type_mismatch() {
        let v = validator();
        let err = v.validate("image.png", "application/pdf", 1, b"").unwrap_err();
        assert_eq!(err.rule(), "content_type_mismatch");
    }

    #[test]
    fn rejects_oversized_declared_or_sampled_content() {
        let v = validator();
        assert_eq!(
            v.validate("a.txt", "text/plain", 2048, b""),
            Err(ValidationError::TooLarge { size: 2048, max: 1024 })
        );
        let sample = vec![0u8; 1025];
        assert_eq!(
            v.validate("a.txt", "text/plain", 10, &sample),
            Err(ValidationError::TooLarge { size: 1025, max: 1024 })
        );
    }

    #[test]
    fn first_failing_rule_wins() {
        let v = validator();
        let err = v.validate("../x.exe", "application/zip", 1 << 30, b"").unwrap_err();
        assert_eq!(err.rule(), "name");
    }

    #[test]
    fn extension_helpers() {
        assert_eq!(extension_of("a/b/Report.PDF"), Some("pdf".into()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".into()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(normalize_content_type(" Text/Plain ; charset=UTF-8"), "text/plain");
    }
}
