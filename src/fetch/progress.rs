use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Spinner style used while the run is in progress.
/// - Yellow spinner with animated braille-style frames.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

/// Running counters for one run, optionally rendered as a spinner.
pub struct Progress {
    bar: ProgressBar,
    fetched: AtomicUsize,
    missing: AtomicUsize,
    failed: AtomicUsize,
}

impl Progress {
    /// Counters rendered as a steady-ticking spinner on stderr.
    pub fn spinner() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::with_bar(bar)
    }

    /// Counters only; nothing is drawn.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            fetched: AtomicUsize::new(0),
            missing: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn fetched(&self, path: &str) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
        self.refresh(path);
    }

    pub fn missing(&self, path: &str) {
        self.missing.fetch_add(1, Ordering::Relaxed);
        self.refresh(path);
    }

    pub fn failed(&self, path: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.refresh(path);
    }

    /// `(fetched, missing, failed)` so far.
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.fetched.load(Ordering::Relaxed),
            self.missing.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn refresh(&self, last: &str) {
        let (f, m, e) = self.counts();
        self.bar
            .set_message(format!("fetched {f}, missing {m}, failed {e} ({last})"));
    }
}
