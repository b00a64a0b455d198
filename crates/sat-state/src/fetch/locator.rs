use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::errors::StateError;

/// Characters a state file path may not contain.
const FORBIDDEN_PATH_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\0'];

/// Where a state document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Url(Url),
    File(PathBuf),
}

impl Locator {
    /// Classify a locator string.
    ///
    /// Anything that parses as an `http(s)` URL with a host is a URL; everything
    /// else must be a path to an existing regular file.
    pub fn parse(input: &str) -> Result<Self, StateError> {
        if let Ok(url) = Url::parse(input)
            && matches!(url.scheme(), "http" | "https")
            && url.host_str().is_some_and(|h| !h.is_empty())
        {
            return Ok(Locator::Url(url));
        }
        validate_file_path(input).map(Locator::File)
    }
}

/// Check that `input` names an existing regular file.
pub fn validate_file_path(input: &str) -> Result<PathBuf, StateError> {
    let invalid = |reason: &str| StateError::InvalidLocator {
        locator: input.to_string(),
        reason: reason.to_string(),
    };

    if input.trim().is_empty() {
        return Err(invalid("empty path"));
    }
    if input.contains(FORBIDDEN_PATH_CHARS) {
        return Err(invalid("path contains invalid characters"));
    }

    let path = Path::new(input);
    match path.metadata() {
        Ok(meta) if meta.is_file() => Ok(path.to_path_buf()),
        Ok(_) => Err(invalid("not a regular file")),
        Err(e) => Err(invalid(&format!("cannot stat path: {e}"))),
    }
}

/// Registry address without scheme or trailing slash.
pub fn format_registry_url(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    stripped.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn http_urls_are_urls() {
        let loc = Locator::parse("https://gc.example.com/states/edge.json").unwrap();
        assert!(matches!(loc, Locator::Url(u) if u.host_str() == Some("gc.example.com")));

        let loc = Locator::parse("http://10.0.0.1:8080/state").unwrap();
        assert!(matches!(loc, Locator::Url(_)));
    }

    #[test]
    fn existing_file_is_a_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{}}").unwrap();
        let input = f.path().to_str().unwrap().to_string();

        assert_eq!(
            Locator::parse(&input).unwrap(),
            Locator::File(PathBuf::from(&input))
        );
    }

    #[test]
    fn other_schemes_fall_back_to_paths_and_fail() {
        let err = Locator::parse("ftp://gc.example.com/state").unwrap_err();
        assert!(matches!(err, StateError::InvalidLocator { .. }));
    }

    #[test]
    fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");

        let err = validate_file_path(missing.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("cannot stat path"));
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_file_path(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn forbidden_characters_are_rejected() {
        for input in ["state?.json", "a|b", "what*", "x<y>", "nul\0byte"] {
            let err = validate_file_path(input).unwrap_err();
            assert!(err.to_string().contains("invalid characters"), "{input}");
        }
        assert!(validate_file_path("   ").is_err());
    }

    #[test]
    fn registry_url_formatting() {
        assert_eq!(format_registry_url("https://harbor.example.com/"), "harbor.example.com");
        assert_eq!(format_registry_url("http://10.0.0.1:5000"), "10.0.0.1:5000");
        assert_eq!(format_registry_url("harbor.example.com"), "harbor.example.com");
    }
}
