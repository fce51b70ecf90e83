use anyhow::Result;
use arboard::Clipboard;
#[cfg(target_os = "linux")]
use arboard::SetExtLinux;
use std::time::{Duration, Instant};

pub const DAEMON_FLAG: &str = "__clipboard_daemon";

#[cfg(target_os = "linux")]
fn run_daemon_mode() -> Result<()> {
    let text = std::io::read_to_string(std::io::stdin())?;

    let mut clipboard = Clipboard::new()?;
    // Blocks until another program takes ownership of the selection.
    clipboard.set().wait().text(text)?;
    Ok(())
}

/// Checks if the DAEMON_FLAG is present in args. If so, runs in daemon mode and exits.
/// Returns Ok(true) if daemon mode was run (and exited), Ok(false) otherwise.
pub fn check_and_run_daemon_if_requested() -> Result<bool> {
    if std::env::args().any(|a| a == DAEMON_FLAG) {
        #[cfg(target_os = "linux")]
        {
            run_daemon_mode()?;
            return Ok(true);
        }
        #[cfg(not(target_os = "linux"))]
        {
            eprintln!(
                "Warning: {} flag used on non-Linux system. Ignoring.",
                DAEMON_FLAG
            );
            std::process::exit(0);
        }
    }
    Ok(false)
}

pub fn copy_text_to_clipboard(text: String) -> Result<()> {
    #[cfg(not(target_os = "linux"))]
    {
        let mut clipboard = Clipboard::new()?;
        clipboard.set_text(text)?;
    }

    #[cfg(target_os = "linux")]
    {
        use std::io::Write;
        use std::process::{Command, Stdio};

        // X11/Wayland selections die with their owner, so a detached copy of
        // this binary keeps serving the text after we exit.
        let mut child = Command::new(std::env::current_exe()?)
            .arg(DAEMON_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .current_dir("/")
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
            stdin.flush()?;
        } else {
            return Err(anyhow::anyhow!("Failed to get stdin for clipboard daemon"));
        }
        drop(child);
    }
    Ok(())
}

/// Anything the UI can read text from and copy text to.
pub trait ClipboardAccess {
    /// Trimmed clipboard text, or `None` when it holds no usable text.
    fn read_text(&mut self) -> Option<String>;
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// The real system clipboard, opened lazily and kept for later polls.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl ClipboardAccess for SystemClipboard {
    fn read_text(&mut self) -> Option<String> {
        if self.inner.is_none() {
            match Clipboard::new() {
                Ok(c) => self.inner = Some(c),
                Err(e) => {
                    tracing::debug!("clipboard unavailable: {}", e);
                    return None;
                }
            }
        }
        let text = self.inner.as_mut()?.get_text().ok()?;
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        copy_text_to_clipboard(text.to_string())
    }
}

/// Poll-compare-act watcher over clipboard text.
#[derive(Debug)]
pub struct ClipboardWatcher {
    enabled: bool,
    last_seen: Option<String>,
    ignored: Option<String>,
    min_chars: usize,
    interval: Duration,
    next_poll: Option<Instant>,
}

impl ClipboardWatcher {
    pub fn new(interval: Duration, min_chars: usize) -> Self {
        ClipboardWatcher {
            enabled: false,
            last_seen: None,
            ignored: None,
            min_chars: min_chars.max(1),
            interval,
            next_poll: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts watching. The snapshot is cleared, so whatever is on the
    /// clipboard right now counts as new on the first poll.
    pub fn enable(&mut self, now: Instant) {
        self.enabled = true;
        self.last_seen = None;
        self.next_poll = Some(now);
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.next_poll = None;
    }

    /// Text this tool put on the clipboard itself; never treated as a reply.
    pub fn ignore(&mut self, text: &str) {
        self.ignored = Some(text.trim().to_string());
    }

    /// Compares one clipboard reading with the snapshot and returns the text
    /// when it is a new reply.
    pub fn observe(&mut self, text: Option<&str>) -> Option<String> {
        let text = text?.trim();
        if text.is_empty() || self.last_seen.as_deref() == Some(text) {
            return None;
        }
        self.last_seen = Some(text.to_string());
        if self.ignored.as_deref() == Some(text) || text.chars().count() < self.min_chars {
            return None;
        }
        Some(text.to_string())
    }

    pub fn poll_due(&self, now: Instant) -> bool {
        self.enabled && self.next_poll.is_some_and(|at| now >= at)
    }

    /// Reads the clipboard when the interval has elapsed.
    pub fn poll(&mut self, source: &mut dyn ClipboardAccess, now: Instant) -> Option<String> {
        if !self.poll_due(now) {
            return None;
        }
        self.next_poll = Some(now + self.interval);
        let text = source.read_text();
        self.observe(text.as_deref())
    }
}
