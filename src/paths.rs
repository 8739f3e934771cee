use anyhow::{Context, Result, bail};
use reqwest::Url;
use std::fmt;
use std::{env, path::PathBuf};

use crate::error::FetchError;

/// A path relative to the remote `.git/` directory, used both for the
/// request URL and for the file under the output directory.
///
/// Always normalized: no empty or `.` segments, no absolute paths and no
/// `..` anywhere except one leading `../` for files living next to `.git/`
/// (the working-tree `.gitignore` and the paths it lists).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// Validate and normalize a path relative to `.git/`.
    ///
    /// Empty and `.` segments are dropped, so `refs//heads/./main` becomes
    /// `refs/heads/main`.
    ///
    /// # Errors
    /// Returns [`FetchError::InvalidPath`] if the path:
    /// - is empty, or empty after normalization,
    /// - is absolute or contains `\` or NUL,
    /// - contains `..` anywhere other than a single leading `../`.
    pub fn parse(s: &str) -> std::result::Result<Self, FetchError> {
        let invalid = || FetchError::InvalidPath(s.to_string());
        if s.is_empty() || s.starts_with('/') || s.contains(['\\', '\0']) {
            return Err(invalid());
        }

        let (sibling, rest) = match s.strip_prefix("../") {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let mut parts = Vec::new();
        for seg in rest.split('/') {
            match seg {
                "" | "." => continue,
                ".." => return Err(invalid()),
                other => parts.push(other),
            }
        }
        if parts.is_empty() {
            return Err(invalid());
        }

        let joined = parts.join("/");
        Ok(Self(if sibling { format!("../{joined}") } else { joined }))
    }

    /// Build from a path known to be well-formed (seed constants, object paths).
    pub(crate) fn from_trusted(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The normalized path, `/`-separated.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the `../<file>` sibling exception.
    pub fn is_sibling(&self) -> bool {
        self.0.starts_with("../")
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse the base URL of an exposed repository. It must end with `.git/`.
pub fn parse_base_url(s: &str) -> Result<Url> {
    let url = Url::parse(s).with_context(|| format!("invalid URL: {s}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported scheme: {}", url.scheme());
    }
    if !url.path().ends_with(".git/") {
        bail!("URL must end with .git/ (got {s})");
    }
    Ok(url)
}

/// Default output directory: `<host><path>` of the base URL,
/// e.g. `https://example.com/app/.git/` → `example.com/app/.git`.
pub fn default_output_dir(base: &Url) -> PathBuf {
    let path = base.path().trim_start_matches('/');
    match base.host_str() {
        Some(host) => PathBuf::from(host).join(path),
        None => PathBuf::from(path),
    }
}

/// Directory holding the optional `config.toml`.
///
/// `$XDG_CONFIG_HOME/dotgit`, falling back to `$HOME/.config/dotgit`.
pub fn config_home() -> PathBuf {
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    base.join("dotgit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_segments() {
        assert_eq!(RelPath::parse("refs//heads/./main").unwrap().as_str(), "refs/heads/main");
        assert_eq!(RelPath::parse("logs/HEAD").unwrap().as_str(), "logs/HEAD");
    }

    #[test]
    fn parse_allows_only_leading_sibling_escape() {
        let p = RelPath::parse("../.gitignore").unwrap();
        assert!(p.is_sibling());
        assert_eq!(p.as_str(), "../.gitignore");

        assert!(RelPath::parse("../../etc/passwd").is_err());
        assert!(RelPath::parse("refs/../../x").is_err());
        assert!(RelPath::parse("/etc/passwd").is_err());
        assert!(RelPath::parse("..").is_err());
        assert!(RelPath::parse("").is_err());
    }

    #[test]
    fn base_url_must_end_with_dot_git_slash() {
        assert!(parse_base_url("https://example.com/.git/").is_ok());
        assert!(parse_base_url("https://example.com/app/.git/").is_ok());
        assert!(parse_base_url("https://example.com/.git").is_err());
        assert!(parse_base_url("https://example.com/").is_err());
        assert!(parse_base_url("ftp://example.com/.git/").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn default_output_dir_uses_host_and_path() {
        let url = Url::parse("https://example.com/app/.git/").unwrap();
        assert_eq!(default_output_dir(&url), PathBuf::from("example.com/app/.git"));

        let url = Url::parse("http://10.0.0.1:8080/.git/").unwrap();
        assert_eq!(default_output_dir(&url), PathBuf::from("10.0.0.1/.git"));
    }
}
