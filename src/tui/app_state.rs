use std::time::{Duration, Instant};

pub(super) const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(super) enum AppMode {
    Normal,
    /// Typed characters go into the reply box.
    EditingReply,
    Help,
}

/// Which half of the file panel is shown.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(super) enum FileTab {
    Inbox,
    Tagged,
}

impl FileTab {
    pub(super) fn toggled(self) -> Self {
        match self {
            FileTab::Inbox => FileTab::Tagged,
            FileTab::Tagged => FileTab::Inbox,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Severity {
    Warning,
    Error,
}

/// Transient one-line message under the panels.
#[derive(Debug, Clone)]
pub(super) struct Notification {
    pub(super) text: String,
    pub(super) expires_at: Instant,
}

/// Modal message box, dismissed with any key.
#[derive(Debug, Clone)]
pub(super) struct Popup {
    pub(super) title: &'static str,
    pub(super) body: String,
    pub(super) severity: Severity,
}
