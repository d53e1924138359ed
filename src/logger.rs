//! Terminal output: prefixed log lines, build progress, watch status.
//!
//! ```ignore
//! log!("build"; "{} artifacts planned", count);
//! debug!("plan"; "{path}: {reason}");
//! ```
//!
//! Output is best effort. A closed or redirected stdout never fails a build,
//! so every write result is dropped.

use crossterm::{
    cursor, queue,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{StdoutLock, Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// Set from `--verbose`; gates [`debug!`](crate::debug).
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set while a [`ProgressLine`] owns the current terminal line.
static PROGRESS_ACTIVE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

// ============================================================================
// Macros
// ============================================================================

/// Print `[module] message`.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like [`log!`], only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Log lines
// ============================================================================

pub fn log(module: &str, message: &str) {
    let mut out = stdout().lock();
    if PROGRESS_ACTIVE.load(Ordering::Relaxed) {
        clear_line(&mut out);
    }
    let _ = writeln!(out, "{} {message}", prefix(module));
    let _ = out.flush();
}

/// Colored `[module]` tag. Destructive phases stand out from build chatter.
fn prefix(module: &str) -> String {
    let tag = format!("[{module}]");
    match module {
        "watch" => tag.bright_green().bold().to_string(),
        "error" | "failed" | "record" => tag.bright_red().bold().to_string(),
        "prune" | "clean" => tag.bright_magenta().bold().to_string(),
        "warning" | "hook" => tag.yellow().bold().to_string(),
        _ => tag.bright_yellow().bold().to_string(),
    }
}

fn clear_line(out: &mut StdoutLock<'_>) {
    let _ = queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine));
}

// ============================================================================
// Watch status
// ============================================================================

/// Outcome of one watch-mode rebuild.
#[derive(Debug, Clone, Copy)]
pub enum Status<'a> {
    Built(&'a str),
    Unchanged,
    Failed { summary: &'a str, detail: &'a str },
}

/// Status block for watch mode. Each rebuild replaces the block of the
/// previous one, so a long session shows only the latest outcome.
#[derive(Debug, Default)]
pub struct WatchStatus {
    /// Height of the block currently on screen.
    shown: usize,
}

static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> = LazyLock::new(Mutex::default);

impl WatchStatus {
    pub fn show(&mut self, status: Status<'_>) {
        let body = match status {
            Status::Built(summary) => format!("{} {summary}", "✓".green()),
            Status::Unchanged => "no changes".dimmed().to_string(),
            Status::Failed { summary, detail } if detail.is_empty() => {
                format!("{} {summary}", "✗".red())
            }
            Status::Failed { summary, detail } => format!("{} {summary}\n{detail}", "✗".red()),
        };

        let mut out = stdout().lock();
        if let Ok(up) = u16::try_from(self.shown)
            && up > 0
        {
            let _ = queue!(out, cursor::MoveUp(up), Clear(ClearType::FromCursorDown));
        }
        let _ = writeln!(out, "{} {body}", format!("[{}]", clock()).dimmed());
        let _ = out.flush();

        self.shown = block_height(&body);
    }

    /// Leave the current block on screen; the next one prints below it.
    pub fn detach(&mut self) {
        self.shown = 0;
    }
}

/// Replace the global watch status block.
pub fn watch_status(status: Status<'_>) {
    WATCH_STATUS.lock().show(status);
}

pub fn watch_status_detach() {
    WATCH_STATUS.lock().detach();
}

fn block_height(body: &str) -> usize {
    body.lines().count().max(1)
}

/// Wall clock `HH:MM:SS` (UTC).
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let (h, m, s) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

// ============================================================================
// Progress line
// ============================================================================

/// One updating line of counters during Produce: `[build] pages(3/9) assets(1/4)`.
///
/// Workers call [`inc`](Self::inc) concurrently; redraws use `try_lock` so a
/// worker never waits on the terminal.
pub struct ProgressLine {
    counters: Vec<(&'static str, usize, AtomicUsize)>,
    draw: Mutex<()>,
}

impl ProgressLine {
    /// Counters with a zero total are hidden.
    pub fn new(items: &[(&'static str, usize)]) -> Self {
        let counters = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|&(name, total)| (name, total, AtomicUsize::new(0)))
            .collect();
        PROGRESS_ACTIVE.store(true, Ordering::Relaxed);

        let line = Self {
            counters,
            draw: Mutex::new(()),
        };
        line.redraw(false);
        line
    }

    pub fn inc(&self, name: &str) {
        let Some((_, _, done)) = self.counters.iter().find(|(n, ..)| *n == name) else {
            return;
        };
        done.fetch_add(1, Ordering::Relaxed);
        if let Some(_guard) = self.draw.try_lock() {
            self.redraw(false);
        }
    }

    /// Keep the final counts on screen.
    pub fn finish(self) {
        {
            let _guard = self.draw.lock();
            self.redraw(true);
        }
        PROGRESS_ACTIVE.store(false, Ordering::Relaxed);
        std::mem::forget(self);
    }

    fn text(&self) -> String {
        let parts: Vec<String> = self
            .counters
            .iter()
            .map(|(name, total, done)| format!("{name}({}/{total})", done.load(Ordering::Relaxed)))
            .collect();
        parts.join(" ")
    }

    fn redraw(&self, newline: bool) {
        let mut out = stdout().lock();
        clear_line(&mut out);
        let _ = write!(out, "{} {}", prefix("build"), self.text());
        if newline {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        PROGRESS_ACTIVE.store(false, Ordering::Relaxed);
        let mut out = stdout().lock();
        clear_line(&mut out);
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_block_height() {
        assert_eq!(block_height("built 3 artifacts"), 1);
        assert_eq!(block_height("2 failed\nblog/index.html: render error\n  at x"), 3);
        assert_eq!(block_height(""), 1);
    }

    #[test]
    fn progress_hides_empty_counters() {
        let progress = ProgressLine::new(&[("pages", 2), ("assets", 0)]);
        assert_eq!(progress.counters.len(), 1);
        progress.inc("pages");
        progress.inc("assets");
        assert_eq!(progress.text(), "pages(1/2)");
        progress.finish();
        assert!(!PROGRESS_ACTIVE.load(Ordering::Relaxed));
    }

    #[test]
    fn progress_counts_pages_and_assets() {
        let progress = ProgressLine::new(&[("pages", 3), ("assets", 2)]);
        progress.inc("assets");
        assert_eq!(progress.text(), "pages(0/3) assets(1/2)");
        progress.finish();
    }

    #[test]
    fn clock_format() {
        let c = clock();
        assert_eq!(c.len(), 8);
        assert_eq!(c.matches(':').count(), 2);
    }
}
