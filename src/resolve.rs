//! Turns the text of fetched pointer files into discovery tokens.
//!
//! Nothing here performs I/O: callers hand in lines read back from the
//! [`Mirror`](crate::mirror::Mirror).

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::object::ObjectId;
use crate::paths::RelPath;

static SYMBOLIC_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^refs?:\s+(\S+)$").unwrap());
static PACKED_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^?([0-9a-f]{40})(?:\s+\S+)?$").unwrap());

/// Something worth fetching, found inside a pointer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryToken {
    Object(ObjectId),
    /// `ref: <path>`: resolve the file at `path` instead.
    Symbolic(RelPath),
}

/// Resolve one line of a ref file, `HEAD` or a `*_HEAD` file.
///
/// The whole trimmed line must be an object id or a `ref: <path>` /
/// `refs: <path>` indirection. Ids embedded in longer text are ignored.
pub fn resolve_ref(line: &str) -> Option<DiscoveryToken> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(id) = ObjectId::parse(line) {
        return Some(DiscoveryToken::Object(id));
    }
    if let Some(caps) = SYMBOLIC_REF.captures(line) {
        return match RelPath::parse(&caps[1]) {
            Ok(p) if !p.is_sibling() => Some(DiscoveryToken::Symbolic(p)),
            _ => {
                debug!(line, "ignoring symbolic ref with unusable target");
                None
            }
        };
    }
    debug!(line, "no ref found in line");
    None
}

/// Resolve one reflog entry: `<old> <new> <committer> <time> <tz>\t<msg>`.
///
/// Yields the old and new ids that are real objects, skipping the all-zero id.
pub fn resolve_reflog_line(line: &str) -> Vec<ObjectId> {
    let mut fields = line.split_whitespace();
    let (Some(old), Some(new)) = (fields.next(), fields.next()) else {
        if !line.trim().is_empty() {
            debug!(line, "malformed reflog line");
        }
        return Vec::new();
    };

    let mut ids: Vec<ObjectId> = [old, new].into_iter().filter_map(ObjectId::parse).collect();
    ids.dedup();
    ids
}

/// Resolve one `FETCH_HEAD` line: `<id>\t[not-for-merge]\t<description>`.
///
/// Only the first tab-separated field is considered, and it must be an
/// exact id. Plain ref lines are accepted too.
pub fn resolve_fetch_head_line(line: &str) -> Option<DiscoveryToken> {
    let first = line.split('\t').next().unwrap_or_default();
    resolve_ref(first)
}

/// Resolve one `packed-refs` line: `<id> <refname>` or a peeled `^<id>`.
pub fn resolve_packed_ref_line(line: &str) -> Option<ObjectId> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let caps = PACKED_REF.captures(line)?;
    ObjectId::parse(&caps[1])
}

/// Map a working-tree `.gitignore` line to a sibling path worth requesting.
///
/// Comments, negations and glob patterns are not concrete paths.
pub fn gitignore_entry(line: &str) -> Option<RelPath> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }
    if line.contains(['*', '?', '[']) {
        debug!(line, "skipping glob pattern from .gitignore");
        return None;
    }
    let entry = line.trim_start_matches('/');
    RelPath::parse(&format!("../{entry}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0123456789abcdef0123456789abcdef01234567";
    const ID2: &str = "89abcdef0123456789abcdef0123456789abcdef";
    const NULL: &str = "0000000000000000000000000000000000000000";

    fn oid(s: &str) -> ObjectId {
        ObjectId::parse(s).unwrap()
    }

    #[test]
    fn resolve_ref_accepts_exact_id() {
        assert_eq!(resolve_ref(ID), Some(DiscoveryToken::Object(oid(ID))));
        assert_eq!(resolve_ref(&format!("{ID}\n")), Some(DiscoveryToken::Object(oid(ID))));
    }

    #[test]
    fn resolve_ref_ignores_embedded_ids() {
        assert_eq!(resolve_ref(&format!("seehttps://x/{ID}")), None);
        assert_eq!(resolve_ref(&format!("commit {ID} message")), None);
        assert_eq!(resolve_ref(NULL), None);
        assert_eq!(resolve_ref(""), None);
    }

    #[test]
    fn resolve_ref_follows_both_symbolic_spellings() {
        let want = Some(DiscoveryToken::Symbolic(RelPath::parse("refs/heads/main").unwrap()));
        assert_eq!(resolve_ref("refs: refs/heads/main"), want);
        assert_eq!(resolve_ref("ref: refs/heads/main\n"), want);
    }

    #[test]
    fn resolve_ref_rejects_escaping_targets() {
        assert_eq!(resolve_ref("ref: ../../etc/passwd"), None);
        assert_eq!(resolve_ref("ref: ../config"), None);
        assert_eq!(resolve_ref("ref: /etc/passwd"), None);
    }

    #[test]
    fn reflog_line_filters_null_id() {
        let line = format!("{NULL} {ID} A U Thor <a@example.com> 1700000000 +0000\tcommit (initial): x");
        assert_eq!(resolve_reflog_line(&line), vec![oid(ID)]);
    }

    #[test]
    fn reflog_line_yields_both_ids() {
        let line = format!("{ID} {ID2} A U Thor <a@example.com> 1700000000 +0000\tcommit: y");
        assert_eq!(resolve_reflog_line(&line), vec![oid(ID), oid(ID2)]);
    }

    #[test]
    fn reflog_line_malformed_yields_nothing() {
        assert!(resolve_reflog_line("").is_empty());
        assert!(resolve_reflog_line(ID).is_empty());
        assert!(resolve_reflog_line("not a reflog line").is_empty());
    }

    #[test]
    fn fetch_head_uses_first_field() {
        let line = format!("{ID}\t\tbranch 'main' of https://example.com/repo");
        assert_eq!(resolve_fetch_head_line(&line), Some(DiscoveryToken::Object(oid(ID))));
        let line = format!("{ID}\tnot-for-merge\tbranch 'dev' of https://example.com/repo");
        assert_eq!(resolve_fetch_head_line(&line), Some(DiscoveryToken::Object(oid(ID))));
        assert_eq!(resolve_fetch_head_line(&format!("x{ID}\t\t")), None);
    }

    #[test]
    fn packed_refs_lines() {
        assert_eq!(resolve_packed_ref_line("# pack-refs with: peeled fully-peeled sorted"), None);
        assert_eq!(resolve_packed_ref_line(&format!("{ID} refs/heads/main")), Some(oid(ID)));
        assert_eq!(resolve_packed_ref_line(&format!("^{ID2}")), Some(oid(ID2)));
        assert_eq!(resolve_packed_ref_line(&format!("{ID} refs/tags/v1 trailing")), None);
    }

    #[test]
    fn gitignore_entries() {
        assert_eq!(gitignore_entry("/target").unwrap().as_str(), "../target");
        assert_eq!(gitignore_entry(".env").unwrap().as_str(), "../.env");
        assert_eq!(gitignore_entry("# comment"), None);
        assert_eq!(gitignore_entry("!keep.txt"), None);
        assert_eq!(gitignore_entry("*.log"), None);
        assert_eq!(gitignore_entry("../secret"), None);
        assert_eq!(gitignore_entry("   "), None);
    }
}
