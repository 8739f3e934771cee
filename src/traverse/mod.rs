mod seeds;

use anyhow::{Context, Result};
use rayon::prelude::*;
use reqwest::Url;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::FetchError;
use crate::fetch::{FetchGate, FetchOutcome, Progress, http_client};
use crate::mirror::Mirror;
use crate::object::ObjectId;
use crate::paths::RelPath;
use crate::resolve::{
    DiscoveryToken, gitignore_entry, resolve_fetch_head_line, resolve_packed_ref_line,
    resolve_ref, resolve_reflog_line,
};

pub use seeds::{HEAD_FILES, is_pointer_file, seed_paths};
use seeds::{FETCH_HEAD, GITIGNORE, PACKED_REFS};

/// A fetch that ended in something other than 200 or 404.
#[derive(Debug, Clone)]
pub struct Failure {
    pub path: RelPath,
    pub message: String,
    /// Failures on well-known seed paths do not fail the run.
    pub tolerated: bool,
}

/// Summary of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub not_found: usize,
    pub pointer_files: usize,
    pub objects: usize,
    pub failures: Vec<Failure>,
}

impl RunReport {
    /// `1` if any fetch failed outside the seed list, `2` if not a single
    /// pointer file was found, `0` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failures.iter().any(|f| !f.tolerated) {
            1
        } else if self.pointer_files == 0 {
            2
        } else {
            0
        }
    }
}

/// Mirror the `.git/` directory at `base` into `output`.
///
/// High-level flow, each phase finishing before the next starts:
/// 1. Seed: request well-known paths and the entries of the working-tree
///    `.gitignore`.
/// 2. Pointers: resolve `HEAD`, `AUTO_MERGE`, `FETCH_HEAD`, `ORIG_HEAD` and
///    `packed-refs`, following `ref:` chains and fetching every object found.
/// 3. Sweep: resolve every file below `refs/` and every reflog entry below
///    `logs/`, fetching the objects they name.
///
/// Fetches within a phase run in parallel on a pool of `cfg.jobs` threads.
pub fn run(base: &Url, output: &Path, cfg: &RunConfig, progress: Progress) -> Result<RunReport> {
    let client = http_client(&cfg.user_agent, cfg.timeout)?;
    let gate = FetchGate::new(client, base.clone(), Mirror::new(output), progress);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.jobs)
        .build()
        .context("failed to start worker pool")?;

    let driver = Driver {
        gate: &gate,
        max_depth: cfg.max_ref_depth,
        failures: Mutex::new(Vec::new()),
        resolved: Mutex::new(HashSet::new()),
        limited: Mutex::new(HashSet::new()),
    };
    let seeds = seed_paths(&cfg.extra_paths);

    pool.install(|| {
        driver.seed_phase(&seeds);
        driver.pointer_phase();
        driver.sweep_phase();
    });
    gate.progress().finish();

    Ok(driver.report())
}

struct Driver<'a> {
    gate: &'a FetchGate,
    max_depth: usize,
    failures: Mutex<Vec<Failure>>,
    /// Pointer files whose lines have been resolved; each is read once per run.
    resolved: Mutex<HashSet<RelPath>>,
    /// Origins already reported for a cycle or the depth cap.
    limited: Mutex<HashSet<RelPath>>,
}

impl Driver<'_> {
    fn seed_phase(&self, seeds: &[RelPath]) {
        seeds.par_iter().for_each(|p| {
            if let Err(e) = self.gate.fetch(p) {
                self.record(p, &e, true);
            }
        });

        let gitignore = RelPath::from_trusted(GITIGNORE);
        if !self.fetched(&gitignore) {
            return;
        }
        let entries: Vec<RelPath> = match self.gate.mirror().read_lines(&gitignore) {
            Ok(lines) => lines.filter_map(|l| gitignore_entry(&l)).collect(),
            Err(e) => {
                self.record(&gitignore, &e.into(), true);
                return;
            }
        };
        info!(count = entries.len(), "fetching paths listed in .gitignore");
        entries.par_iter().for_each(|p| {
            // arbitrary ignored paths 404 or 403 all the time
            let _ = self.gate.fetch(p);
        });
    }

    fn pointer_phase(&self) {
        HEAD_FILES.par_iter().for_each(|name| {
            let path = RelPath::from_trusted(*name);
            if !self.fetched(&path) {
                return;
            }
            let resolver: fn(&str) -> Option<DiscoveryToken> = if *name == FETCH_HEAD {
                resolve_fetch_head_line
            } else {
                resolve_ref
            };
            self.resolve_root(&path, resolver);
        });

        let packed = RelPath::from_trusted(PACKED_REFS);
        if self.fetched(&packed) {
            let ids: BTreeSet<ObjectId> = self
                .lines(&packed)
                .filter_map(|l| resolve_packed_ref_line(&l))
                .collect();
            self.fetch_objects(ids);
        }
    }

    fn sweep_phase(&self) {
        let mirror = self.gate.mirror();

        let refs: Vec<RelPath> = mirror
            .walk("refs")
            .filter(|(_, is_file)| *is_file)
            .map(|(p, _)| p)
            .collect();
        debug!(count = refs.len(), "sweeping refs/");
        refs.par_iter().for_each(|p| self.resolve_root(p, resolve_ref));

        let mut ids = BTreeSet::new();
        for (p, is_file) in mirror.walk("logs") {
            if is_file {
                ids.extend(self.lines(&p).flat_map(|l| resolve_reflog_line(&l)));
            }
        }
        debug!(count = ids.len(), "objects named by reflogs");
        self.fetch_objects(ids);
    }

    /// Resolve a pointer file reached without any indirection.
    fn resolve_root(&self, path: &RelPath, resolver: fn(&str) -> Option<DiscoveryToken>) {
        if self.claim(path) {
            self.resolve_with(path, &[path.clone()], resolver);
        }
    }

    /// Resolve every line of the pointer file at the end of `chain`.
    ///
    /// `chain` holds the files visited to reach it, root first.
    fn resolve_with(
        &self,
        path: &RelPath,
        chain: &[RelPath],
        resolver: fn(&str) -> Option<DiscoveryToken>,
    ) {
        for line in self.lines(path) {
            if let Some(token) = resolver(&line) {
                self.follow(token, path, chain);
            }
        }
    }

    fn follow(&self, token: DiscoveryToken, origin: &RelPath, chain: &[RelPath]) {
        let target = match token {
            DiscoveryToken::Object(id) => return self.fetch_object(id),
            DiscoveryToken::Symbolic(target) => target,
        };

        if chain.contains(&target) {
            let err = FetchError::RefCycle {
                path: target.to_string(),
            };
            return self.record_limit(origin, &err);
        }
        // chain.len() - 1 indirections were followed to reach `origin`
        if chain.len() > self.max_depth {
            let err = FetchError::RecursionLimit {
                path: chain[0].to_string(),
                depth: self.max_depth,
            };
            return self.record_limit(origin, &err);
        }

        match self.gate.fetch(&target) {
            Ok(FetchOutcome::Fetched) => {
                if !self.claim(&target) {
                    return;
                }
                let mut next = chain.to_vec();
                next.push(target.clone());
                self.resolve_with(&target, &next, resolve_ref);
            }
            Ok(_) => debug!(from = %origin, to = %target, "symbolic ref target unavailable"),
            Err(e) => self.record(&target, &e, false),
        }
    }

    /// Mark `path` as resolved. False if it already was.
    fn claim(&self, path: &RelPath) -> bool {
        let mut resolved = self.resolved.lock().unwrap_or_else(|e| e.into_inner());
        resolved.insert(path.clone())
    }

    /// Record a cycle or depth failure, once per origin file.
    fn record_limit(&self, origin: &RelPath, err: &FetchError) {
        let first = {
            let mut limited = self.limited.lock().unwrap_or_else(|e| e.into_inner());
            limited.insert(origin.clone())
        };
        if first {
            warn!(path = %origin, error = %err, "giving up on symbolic ref");
            self.record(origin, err, false);
        }
    }

    fn fetch_objects(&self, ids: BTreeSet<ObjectId>) {
        let ids: Vec<ObjectId> = ids.into_iter().collect();
        ids.par_iter().for_each(|id| self.fetch_object(*id));
    }

    fn fetch_object(&self, id: ObjectId) {
        let path = id.relative_path();
        match self.gate.fetch(&path) {
            Ok(FetchOutcome::NotFound) => debug!(%id, "object not served (packed or collected)"),
            Ok(_) => {}
            Err(e) => self.record(&path, &e, false),
        }
    }

    /// True when `path` was fetched successfully during this run.
    fn fetched(&self, path: &RelPath) -> bool {
        matches!(self.gate.fetch(path), Ok(FetchOutcome::Fetched))
    }

    fn lines(&self, path: &RelPath) -> impl Iterator<Item = String> {
        match self.gate.mirror().read_lines(path) {
            Ok(lines) => Some(lines),
            Err(e) => {
                self.record(path, &e.into(), false);
                None
            }
        }
        .into_iter()
        .flatten()
    }

    fn record(&self, path: &RelPath, err: &FetchError, tolerated: bool) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.push(Failure {
            path: path.clone(),
            message: err.to_string(),
            tolerated,
        });
    }

    fn report(self) -> RunReport {
        let mut report = RunReport {
            failures: self.failures.into_inner().unwrap_or_else(|e| e.into_inner()),
            ..Default::default()
        };
        for (path, outcome) in self.gate.outcomes() {
            match outcome {
                FetchOutcome::Fetched => {
                    report.fetched += 1;
                    if is_pointer_file(&path) {
                        report.pointer_files += 1;
                    }
                    if ObjectId::from_relative_path(path.as_str()).is_some() {
                        report.objects += 1;
                    }
                }
                FetchOutcome::NotFound => report.not_found += 1,
                FetchOutcome::Failed => {}
            }
        }
        report
    }
}
