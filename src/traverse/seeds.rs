use crate::paths::RelPath;

/// Files at the top of `.git/` that hold a ref or an object id.
pub const HEAD_FILES: [&str; 4] = ["HEAD", "AUTO_MERGE", "FETCH_HEAD", "ORIG_HEAD"];

pub const FETCH_HEAD: &str = "FETCH_HEAD";
pub const PACKED_REFS: &str = "packed-refs";
pub const GITIGNORE: &str = "../.gitignore";

const METADATA: [&str; 5] = ["config", "description", "info/exclude", "index", PACKED_REFS];

const REFS: [&str; 8] = [
    "refs/heads/master",
    "refs/heads/main",
    "refs/origin/master",
    "refs/origin/main",
    "refs/remotes/origin/HEAD",
    "refs/remotes/origin/master",
    "refs/remotes/origin/main",
    "refs/stash",
];

/// Well-known paths requested before anything is discovered.
///
/// Every ref location is paired with its reflog under `logs/`, and
/// `logs/HEAD` is included for `HEAD`. `extra` is appended as given.
pub fn seed_paths(extra: &[RelPath]) -> Vec<RelPath> {
    let mut seeds: Vec<RelPath> = Vec::new();
    seeds.extend(HEAD_FILES.iter().map(|p| RelPath::from_trusted(*p)));
    seeds.extend(METADATA.iter().map(|p| RelPath::from_trusted(*p)));
    seeds.extend(REFS.iter().map(|p| RelPath::from_trusted(*p)));
    seeds.push(RelPath::from_trusted("logs/HEAD"));
    seeds.extend(REFS.iter().map(|p| RelPath::from_trusted(format!("logs/{p}"))));
    seeds.push(RelPath::from_trusted(GITIGNORE));

    for p in extra {
        if !seeds.contains(p) {
            seeds.push(p.clone());
        }
    }
    seeds
}

/// Whether a fetched path is a ref, reflog or `*HEAD` file, as opposed to
/// repository metadata or an object.
pub fn is_pointer_file(path: &RelPath) -> bool {
    let s = path.as_str();
    HEAD_FILES.contains(&s) || s == PACKED_REFS || s.starts_with("refs/") || s.starts_with("logs/")
}
