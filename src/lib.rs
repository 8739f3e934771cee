//! Crate entry point for **dotgit**.
//!
//! Rebuilds the loose-object store of a web server's exposed `.git/`
//! directory without directory listing: pointer files are fetched from
//! well-known locations, parsed for object ids and `ref:` indirections, and
//! every discovered object is requested individually.
//!
//! Each submodule encapsulates one responsibility (local mirror, fetching,
//! pointer parsing, traversal, settings). The `pub use` re-exports make the
//! pieces used by the CLI and by tests reachable from the crate root.

mod config;
mod error;
mod fetch;
mod mirror;
mod object;
mod paths;
mod resolve;
mod traverse;

pub use config::{Overrides, RunConfig, Settings, default_jobs, load_settings};
pub use error::FetchError;
pub use fetch::{DEFAULT_USER_AGENT, FetchGate, FetchOutcome, Progress, http_client};
pub use mirror::{Lines, Mirror};
pub use object::{NULL_ID, ObjectId};
pub use paths::{RelPath, config_home, default_output_dir, parse_base_url};
pub use resolve::{
    DiscoveryToken, gitignore_entry, resolve_fetch_head_line, resolve_packed_ref_line,
    resolve_ref, resolve_reflog_line,
};
pub use traverse::{Failure, HEAD_FILES, RunReport, is_pointer_file, run, seed_paths};
