mod client;
mod progress;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};
use crate::mirror::Mirror;
use crate::paths::RelPath;

pub use client::{DEFAULT_USER_AGENT, http_client};
pub use progress::Progress;

/// How a single path fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Body written to the mirror.
    Fetched,
    /// Remote answered 404. Expected for most optional files.
    NotFound,
    /// Any other status or a transport error.
    Failed,
}

/// Performs GETs against the base URL and stores bodies in the [`Mirror`].
///
/// Each distinct relative path is requested at most once per gate. Callers
/// racing on the same path block until the first request finishes and then
/// share its outcome.
pub struct FetchGate {
    client: Client,
    base: Url,
    mirror: Mirror,
    progress: Progress,
    seen: Mutex<HashMap<RelPath, Arc<OnceLock<FetchOutcome>>>>,
}

impl FetchGate {
    /// Create a gate for one run. `base` must end with `.git/`; the
    /// fetched-set starts empty.
    pub fn new(client: Client, base: Url, mirror: Mirror, progress: Progress) -> Self {
        Self {
            client,
            base,
            mirror,
            progress,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// The local tree bodies are written into.
    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Running counters, also used for the spinner.
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Fetch `path` unless it was already attempted.
    ///
    /// A repeated call never touches the network. It reports `Fetched` only
    /// while the mirrored file still exists, and `NotFound` otherwise.
    ///
    /// # Errors
    /// - [`FetchError::Transport`] or [`FetchError::Protocol`] for a request
    ///   that did not end in 2xx or 404.
    /// - [`FetchError::Io`] if the body cannot be written.
    ///
    /// An error goes only to the caller that issued the request; later calls
    /// for the same path get `Ok(FetchOutcome::Failed)`.
    pub fn fetch(&self, path: &RelPath) -> Result<FetchOutcome> {
        let cell = {
            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(seen.entry(path.clone()).or_default())
        };

        let mut first: Option<Result<FetchOutcome>> = None;
        let outcome = *cell.get_or_init(|| {
            let res = self.request(path);
            let outcome = match &res {
                Ok(o) => *o,
                Err(e) => {
                    warn!(path = %path, error = %e, "fetch failed");
                    self.progress.failed(path.as_str());
                    FetchOutcome::Failed
                }
            };
            first = Some(res);
            outcome
        });

        match first {
            Some(res) => res,
            None if outcome == FetchOutcome::Fetched && !self.mirror.exists(path) => {
                Ok(FetchOutcome::NotFound)
            }
            None => Ok(outcome),
        }
    }

    /// Whether `path` has been attempted in this run.
    #[cfg(test)]
    fn attempted(&self, path: &RelPath) -> bool {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.get(path).is_some_and(|c| c.get().is_some())
    }

    /// Every completed attempt so far, sorted by path.
    pub fn outcomes(&self) -> Vec<(RelPath, FetchOutcome)> {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = seen
            .iter()
            .filter_map(|(p, c)| c.get().map(|o| (p.clone(), *o)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Remote URL for `path`, each segment percent-encoded so that `#`, `?`
    /// and `%` in ref names stay part of the path.
    fn url_for(&self, path: &RelPath) -> Result<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| FetchError::InvalidPath(path.to_string()))?;
            segs.pop_if_empty();
            let rest = match path.as_str().strip_prefix("../") {
                Some(rest) => {
                    segs.pop();
                    rest
                }
                None => path.as_str(),
            };
            segs.extend(rest.split('/'));
        }
        Ok(url)
    }

    fn request(&self, path: &RelPath) -> Result<FetchOutcome> {
        let url = self.url_for(path)?;

        let mut resp = self.client.get(url.clone()).send()?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%url, "[404] not found");
            self.progress.missing(path.as_str());
            return Ok(FetchOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Protocol {
                status: status.as_u16(),
            });
        }

        let bytes = self.mirror.write(path, &mut resp)?;
        info!(
            %url,
            local = %self.mirror.local_path(path).display(),
            bytes,
            "[{}] fetched",
            status.as_u16()
        );
        self.progress.fetched(path.as_str());
        Ok(FetchOutcome::Fetched)
    }
}
