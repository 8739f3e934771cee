use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::paths::RelPath;

/// Local copy of the remote `.git/` tree, rooted at the output directory.
///
/// Relative paths map one-to-one onto files below `root`, except for the
/// `../<file>` sibling case which lands next to it.
#[derive(Debug, Clone)]
pub struct Mirror {
    root: PathBuf,
}

impl Mirror {
    /// Mirror rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Local file for `path`.
    pub fn local_path(&self, path: &RelPath) -> PathBuf {
        self.root.join(path.as_str())
    }

    /// Whether `path` has been written as a regular file.
    pub fn exists(&self, path: &RelPath) -> bool {
        self.local_path(path).is_file()
    }

    /// Stream `body` into the file for `path`, creating parent directories.
    ///
    /// The data goes to a temporary file in the same directory first and is
    /// renamed into place, so a reader never observes a half-written file.
    ///
    /// # Errors
    /// Any I/O error creating directories, reading `body` or renaming.
    pub fn write(&self, path: &RelPath, body: &mut impl Read) -> io::Result<u64> {
        let dst = self.local_path(path);
        let parent = dst.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        let n = io::copy(body, tmp.as_file_mut())?;
        tmp.persist(&dst).map_err(|e| e.error)?;
        Ok(n)
    }

    /// Lines of an already-fetched text file.
    ///
    /// Re-opens the file on every call. A missing file yields no lines;
    /// invalid UTF-8 is replaced rather than ending the sequence.
    pub fn read_lines(&self, path: &RelPath) -> io::Result<Lines> {
        match File::open(self.local_path(path)) {
            Ok(f) => Ok(Lines {
                inner: Some(BufReader::new(f).split(b'\n')),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Lines { inner: None }),
            Err(e) => Err(e),
        }
    }

    /// Every entry below `subtree` as `(relative path, is_file)`, in a stable
    /// order. A missing subtree yields nothing.
    pub fn walk<'a>(&'a self, subtree: &str) -> impl Iterator<Item = (RelPath, bool)> + 'a {
        WalkDir::new(self.root.join(subtree))
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter_map(move |e| {
                let rel = e.path().strip_prefix(&self.root).ok()?;
                let joined = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let rel = RelPath::parse(&joined).ok()?;
                Some((rel, e.file_type().is_file()))
            })
    }
}

/// Lazy line iterator returned by [`Mirror::read_lines`].
pub struct Lines {
    inner: Option<io::Split<BufReader<File>>>,
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let chunk = self.inner.as_mut()?.next()?;
        match chunk {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).trim_end_matches('\r').to_string()),
            Err(_) => {
                self.inner = None;
                None
            }
        }
    }
}
