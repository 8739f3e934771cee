use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::fetch::DEFAULT_USER_AGENT;
use crate::paths::{RelPath, config_home};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_REF_DEPTH: usize = 8;

/// Optional settings loaded from `config.toml`.
///
/// Example TOML:
/// ```toml
/// jobs = 8
/// timeout_secs = 15
/// user_agent = "Mozilla/5.0"
/// max_ref_depth = 8
/// extra_paths = ["refs/heads/develop", "logs/refs/heads/develop"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub max_ref_depth: Option<usize>,
    #[serde(default)]
    pub extra_paths: Vec<String>,
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

/// Fully resolved knobs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub jobs: usize,
    pub timeout: Duration,
    pub user_agent: String,
    pub max_ref_depth: usize,
    pub extra_paths: Vec<RelPath>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_ref_depth: DEFAULT_MAX_REF_DEPTH,
            extra_paths: Vec::new(),
        }
    }
}

/// Number of in-flight requests when nothing is configured.
pub fn default_jobs() -> usize {
    num_cpus::get().clamp(8, 16)
}

/// Load settings from `explicit`, or from `config_home()/config.toml`.
///
/// # Errors
/// - An explicitly given file that cannot be read.
/// - Invalid TOML in whichever file is used.
///
/// A missing default file yields empty settings.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (config_home().join("config.toml"), false),
    };
    let txt = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Settings::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("config not readable: {}", path.display()));
        }
    };
    toml::from_str(&txt).with_context(|| format!("failed to parse {}", path.display()))
}

impl Settings {
    /// Merge with command-line overrides into a [`RunConfig`].
    pub fn resolve(self, cli: Overrides) -> Result<RunConfig> {
        let jobs = cli.jobs.or(self.jobs).unwrap_or_else(default_jobs);
        if jobs == 0 {
            bail!("jobs must be at least 1");
        }
        let extra_paths = self
            .extra_paths
            .iter()
            .map(|p| RelPath::parse(p).with_context(|| format!("bad extra path in config: {p}")))
            .collect::<Result<Vec<_>>>()?;

        Ok(RunConfig {
            jobs,
            timeout: Duration::from_secs(
                cli.timeout_secs.or(self.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            user_agent: cli
                .user_agent
                .or(self.user_agent)
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            max_ref_depth: self.max_ref_depth.unwrap_or(DEFAULT_MAX_REF_DEPTH),
            extra_paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn parses_all_keys() {
        let s: Settings = toml::from_str(
            r#"
            jobs = 4
            timeout_secs = 10
            user_agent = "ua"
            max_ref_depth = 3
            extra_paths = ["refs/heads/dev"]
            "#,
        )
        .unwrap();
        let rc = s.resolve(Overrides::default()).unwrap();
        assert_eq!(rc.jobs, 4);
        assert_eq!(rc.timeout, Duration::from_secs(10));
        assert_eq!(rc.user_agent, "ua");
        assert_eq!(rc.max_ref_depth, 3);
        assert_eq!(rc.extra_paths[0].as_str(), "refs/heads/dev");
    }

    #[test]
    fn cli_overrides_file() {
        let s = Settings {
            jobs: Some(4),
            user_agent: Some("file".into()),
            ..Default::default()
        };
        let rc = s
            .resolve(Overrides {
                jobs: Some(12),
                timeout_secs: Some(2),
                user_agent: Some("cli".into()),
            })
            .unwrap();
        assert_eq!(rc.jobs, 12);
        assert_eq!(rc.timeout, Duration::from_secs(2));
        assert_eq!(rc.user_agent, "cli");
    }

    #[test]
    fn rejects_zero_jobs_and_escaping_paths() {
        let zero = Settings { jobs: Some(0), ..Default::default() };
        assert!(zero.resolve(Overrides::default()).is_err());

        let bad = Settings {
            extra_paths: vec!["../../etc/passwd".into()],
            ..Default::default()
        };
        assert!(bad.resolve(Overrides::default()).is_err());
    }

    #[test]
    fn default_jobs_is_bounded() {
        let j = default_jobs();
        assert!((8..=16).contains(&j));
    }

    #[test]
    #[serial]
    fn missing_default_file_is_empty() {
        let td = tempdir().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", td.path()) };
        let s = load_settings(None).unwrap();
        assert!(s.jobs.is_none());
        assert!(s.extra_paths.is_empty());
    }

    #[test]
    #[serial]
    fn reads_default_file_from_config_home() {
        let td = tempdir().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", td.path()) };
        fs::create_dir_all(td.path().join("dotgit")).unwrap();
        fs::write(td.path().join("dotgit/config.toml"), "jobs = 9\n").unwrap();
        assert_eq!(load_settings(None).unwrap().jobs, Some(9));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let td = tempdir().unwrap();
        assert!(load_settings(Some(&td.path().join("nope.toml"))).is_err());
    }
}
