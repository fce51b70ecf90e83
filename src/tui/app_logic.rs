use super::app_state::{AppMode, FileTab, NOTIFICATION_TTL, Notification, Popup, Severity};
use crate::clipboard::{ClipboardAccess, ClipboardWatcher};
use crate::errors::ReviewError;
use crate::file_scanner::{FileEntry, Listing};
use crate::tags::Tag;
use crate::watcher::FolderWatcher;
use crate::workspace::{Selection, Workspace};
use crate::{prompt, report, utils};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn wrap_index(current: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as i32 + delta).rem_euclid(len as i32) as usize
}

pub struct ReviewApp {
    pub(super) workspace: Workspace,
    pub(super) project_idx: usize,
    pub(super) delivery_idx: usize,
    pub(super) listing: Listing,
    pub(super) file_tab: FileTab,
    pub(super) cursor: usize,
    pub(super) scroll_offset: usize,
    pub(super) list_viewport_height: usize,
    pub(super) review_idx: usize,
    pub(super) prompt: String,
    pub(super) reply: String,
    pub(super) last_report: Option<PathBuf>,
    pub(super) notification: Option<Notification>,
    pub(super) popup: Option<Popup>,
    pub(super) mode: AppMode,
    pub(super) quit: bool,
    pub(super) clipboard_watch: ClipboardWatcher,
    clipboard: Box<dyn ClipboardAccess>,
    folder_watcher: Option<FolderWatcher>,
    watch_folders: bool,
}

impl ReviewApp {
    pub fn new(
        workspace: Workspace,
        selection: &Selection,
        clipboard: Box<dyn ClipboardAccess>,
    ) -> Self {
        let cfg = workspace.config();
        let project_idx = cfg
            .projects
            .iter()
            .position(|p| *p == selection.project)
            .unwrap_or(0);
        let delivery_idx = cfg
            .deliveries
            .iter()
            .position(|d| *d == selection.delivery)
            .unwrap_or(0);
        let clipboard_watch = ClipboardWatcher::new(
            Duration::from_millis(cfg.clipboard_poll_ms),
            cfg.min_reply_chars,
        );

        let mut app = ReviewApp {
            workspace,
            project_idx,
            delivery_idx,
            listing: Listing::default(),
            file_tab: FileTab::Inbox,
            cursor: 0,
            scroll_offset: 0,
            list_viewport_height: 0, // Will be updated by ui_renderer
            review_idx: 0,
            prompt: String::new(),
            reply: String::new(),
            last_report: None,
            notification: None,
            popup: None,
            mode: AppMode::Normal,
            quit: false,
            clipboard_watch,
            clipboard,
            folder_watcher: None,
            watch_folders: false,
        };
        app.refresh();
        app
    }

    pub(super) fn selection(&self) -> Selection {
        let cfg = self.workspace.config();
        Selection {
            project: cfg.projects[self.project_idx].clone(),
            delivery: cfg.deliveries[self.delivery_idx].clone(),
        }
    }

    // --- Folder state ---

    pub(super) fn refresh(&mut self) {
        let previous_target = self.review_target();
        let sel = self.selection();
        match self.workspace.scan(&sel) {
            Ok(listing) => self.listing = listing,
            Err(e) => {
                tracing::warn!("scan failed: {:#}", e);
                self.listing = Listing::default();
                self.notify(format!("⚠ Could not read the input folder: {e}"));
            }
        }
        let targets = self.listing.review_targets();
        self.review_idx = previous_target
            .and_then(|t| targets.iter().position(|name| *name == t))
            .unwrap_or(0);
        self.clamp_cursor();
    }

    /// Starts following the active input folder for outside changes.
    pub(super) fn enable_folder_watch(&mut self) {
        self.watch_folders = true;
        self.restart_folder_watch();
    }

    fn restart_folder_watch(&mut self) {
        if !self.watch_folders {
            return;
        }
        let dir = self.workspace.input_dir(&self.selection());
        self.folder_watcher = match FolderWatcher::watch(&dir) {
            Ok(w) => {
                tracing::debug!("file list follows {}", w.path().display());
                Some(w)
            }
            Err(e) => {
                tracing::warn!("cannot watch {}: {}", dir.display(), e);
                None
            }
        };
    }

    pub(super) fn visible_entries(&self) -> Vec<&FileEntry> {
        match self.file_tab {
            FileTab::Inbox => self.listing.untagged().collect(),
            FileTab::Tagged => self.listing.tagged(),
        }
    }

    fn selected_entry(&self) -> Option<FileEntry> {
        self.visible_entries().get(self.cursor).map(|e| (*e).clone())
    }

    pub(super) fn review_target(&self) -> Option<String> {
        self.listing.review_targets().get(self.review_idx).cloned()
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible_entries().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
        self.ensure_cursor_visible_in_viewport();
    }

    pub(super) fn move_cursor(&mut self, delta: i32) {
        let len = self.visible_entries().len();
        self.cursor = wrap_index(self.cursor, delta, len);
        self.ensure_cursor_visible_in_viewport();
    }

    pub(super) fn ensure_cursor_visible_in_viewport(&mut self) {
        let len = self.visible_entries().len();
        let height = self.list_viewport_height;
        if len == 0 || height == 0 {
            self.scroll_offset = 0;
            return;
        }
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + height {
            self.scroll_offset = self.cursor + 1 - height;
        }
        self.scroll_offset = self.scroll_offset.min(len.saturating_sub(height));
    }

    fn switch_tab(&mut self) {
        self.file_tab = self.file_tab.toggled();
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    pub(super) fn cycle_project(&mut self, delta: i32) {
        let len = self.workspace.config().projects.len();
        self.project_idx = wrap_index(self.project_idx, delta, len);
        self.on_selection_change();
    }

    pub(super) fn cycle_delivery(&mut self, delta: i32) {
        let len = self.workspace.config().deliveries.len();
        self.delivery_idx = wrap_index(self.delivery_idx, delta, len);
        self.on_selection_change();
    }

    fn on_selection_change(&mut self) {
        self.cursor = 0;
        self.scroll_offset = 0;
        self.review_idx = 0;
        self.refresh();
        self.restart_folder_watch();
        let sel = self.selection();
        tracing::info!("switched to {} / {}", sel.project, sel.delivery);
    }

    pub(super) fn cycle_review_target(&mut self, delta: i32) {
        let len = self.listing.review_targets().len();
        self.review_idx = wrap_index(self.review_idx, delta, len);
    }

    // --- Tagging ---

    pub(super) fn tag_selected(&mut self, tag: Tag) {
        let Some(entry) = self.selected_entry() else {
            self.notify("⚠ No file selected");
            return;
        };
        let sel = self.selection();
        match self.workspace.tag_file(&sel, &entry.name, tag) {
            Ok(_) => {
                self.notify(format!("✓ Tagged {} as {}", entry.name, tag));
                self.refresh();
            }
            Err(e) => {
                tracing::error!("tagging {} failed: {}", entry.name, e);
                self.show_popup("Tagging failed", e.to_string(), Severity::Error);
            }
        }
    }

    pub(super) fn clear_selected_tag(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if entry.tag.is_none() {
            return;
        }
        let sel = self.selection();
        match self.workspace.clear_tag(&sel, &entry.name) {
            Ok(()) => {
                self.notify(format!("✓ Cleared the tag of {}", entry.name));
                self.refresh();
            }
            Err(e) => self.show_popup("Cannot clear tag", e.to_string(), Severity::Warning),
        }
    }

    // --- Prompt ---

    pub(super) fn generate_prompt(&mut self) {
        self.refresh();
        let Some(target) = self.review_target() else {
            self.show_popup(
                "Reminder",
                "There is no pending-review file. Tag one with 3 first.".to_string(),
                Severity::Warning,
            );
            return;
        };
        self.prompt = prompt::build_for_listing(&self.listing, &target);
        self.notify("✓ Prompt generated");
    }

    pub(super) fn copy_prompt(&mut self) {
        let text = self.prompt.trim().to_string();
        if text.is_empty() {
            self.show_popup(
                "Reminder",
                "The prompt is empty. Press g to generate one.".to_string(),
                Severity::Warning,
            );
            return;
        }
        match self.clipboard.write_text(&text) {
            Ok(()) => {
                self.clipboard_watch.ignore(&text);
                self.notify(format!(
                    "✓ Prompt copied to the clipboard (≈ {} tokens)",
                    utils::approx_tokens(&text)
                ));
            }
            Err(e) => self.show_popup("Clipboard", e.to_string(), Severity::Error),
        }
    }

    pub(super) fn clear_prompt(&mut self) {
        self.prompt.clear();
        self.notify("✓ Prompt cleared");
    }

    // --- Reply and report ---

    pub(super) fn clear_reply(&mut self) {
        self.reply.clear();
        self.notify("✓ Reply cleared");
    }

    pub(super) fn paste_reply_from_clipboard(&mut self) {
        match self.clipboard.read_text() {
            Some(text) => {
                self.reply = text;
                self.notify("✓ Reply taken from the clipboard");
            }
            None => self.show_popup(
                "Reminder",
                "The clipboard holds no text.".to_string(),
                Severity::Warning,
            ),
        }
    }

    /// Writes the reply as a Word report. Manual exports report problems in a
    /// popup; automatic ones only in the notification line.
    pub(super) fn export_reply(&mut self, manual: bool) -> bool {
        let target = self.review_target().unwrap_or_default();
        let out_dir = self.workspace.output_dir(&self.selection());
        match report::export(&out_dir, &target, &self.reply) {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.notify(format!("✓ Word report written: {name}"));
                self.last_report = Some(path);
                if manual && self.workspace.config().open_output_after_export {
                    if let Err(e) = utils::open_folder(&out_dir) {
                        tracing::warn!("{:#}", e);
                    }
                }
                true
            }
            Err(e) => {
                let severity = match e {
                    ReviewError::EmptyReply | ReviewError::NoTarget => Severity::Warning,
                    _ => {
                        tracing::error!("Word export failed: {}", e);
                        Severity::Error
                    }
                };
                if manual {
                    self.show_popup("Word export", e.to_string(), severity);
                } else {
                    self.notify(format!("⚠ Word export failed: {e}"));
                }
                false
            }
        }
    }

    pub(super) fn export_from_clipboard(&mut self) {
        match self.clipboard.read_text() {
            Some(text) => {
                self.reply = text;
                self.export_reply(true);
            }
            None => self.show_popup(
                "Reminder",
                "The clipboard holds no text.".to_string(),
                Severity::Warning,
            ),
        }
    }

    pub(super) fn toggle_clipboard_watch(&mut self, now: Instant) {
        if self.clipboard_watch.is_enabled() {
            self.clipboard_watch.disable();
            self.notify("✓ Clipboard watch stopped");
        } else {
            self.clipboard_watch.enable(now);
            self.notify("✓ Clipboard watch started; new replies are exported automatically");
        }
        tracing::info!(enabled = self.clipboard_watch.is_enabled(), "clipboard watch toggled");
    }

    // --- Timers ---

    /// One pass of the timer work: notification expiry, clipboard poll and
    /// folder events.
    pub(super) fn tick(&mut self, now: Instant) {
        if self
            .notification
            .as_ref()
            .is_some_and(|n| now >= n.expires_at)
        {
            self.notification = None;
        }

        if let Some(text) = self.clipboard_watch.poll(self.clipboard.as_mut(), now) {
            tracing::info!(chars = text.chars().count(), "new reply on the clipboard");
            self.reply = text;
            self.export_reply(false);
        }

        if let Some(watcher) = self.folder_watcher.as_mut() {
            let activity = watcher.drain(now);
            if !activity.new_files.is_empty() {
                self.notify("📥 New file detected, please tag it");
            }
            if activity.refresh {
                self.refresh();
            }
        }
    }

    pub(super) fn notify(&mut self, text: impl Into<String>) {
        self.notification = Some(Notification {
            text: text.into(),
            expires_at: Instant::now() + NOTIFICATION_TTL,
        });
    }

    fn show_popup(&mut self, title: &'static str, body: String, severity: Severity) {
        self.popup = Some(Popup {
            title,
            body,
            severity,
        });
    }

    fn open_path(&mut self, path: PathBuf) {
        if let Err(e) = utils::open_folder(&path) {
            self.show_popup("Open folder", format!("{e:#}"), Severity::Error);
        }
    }

    fn open_selected_file(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if let Err(e) = utils::open_in_system(&entry.path.to_string_lossy()) {
            self.show_popup("Open file", format!("{e:#}"), Severity::Error);
        }
    }

    fn open_notebook(&mut self) {
        let url = self.workspace.config().notebook_url.clone();
        if let Err(e) = utils::open_in_system(&url) {
            self.show_popup("Open browser", format!("{e:#}"), Severity::Error);
        }
    }

    // --- Event handling sub-methods ---

    pub(super) fn handle_key(&mut self, key_event: KeyEvent) {
        if self.popup.take().is_some() {
            return;
        }
        match self.mode {
            AppMode::Normal => self.handle_normal_mode_input(key_event),
            AppMode::EditingReply => self.handle_reply_mode_input(key_event),
            AppMode::Help => self.mode = AppMode::Normal,
        }
    }

    pub(super) fn handle_paste(&mut self, text: &str) {
        if self.mode == AppMode::EditingReply {
            self.reply.push_str(text);
        } else {
            self.reply = text.trim().to_string();
            self.notify("✓ Reply pasted");
        }
    }

    fn handle_normal_mode_input(&mut self, key_event: KeyEvent) {
        if key_event.modifiers.contains(KeyModifiers::CONTROL) {
            if key_event.code == KeyCode::Char('c') {
                self.quit = true;
            }
            return;
        }
        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('?') => self.mode = AppMode::Help,
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Tab => self.switch_tab(),
            KeyCode::Char('1') => self.tag_selected(Tag::Standard),
            KeyCode::Char('2') => self.tag_selected(Tag::Template),
            KeyCode::Char('3') => self.tag_selected(Tag::PendingReview),
            KeyCode::Char('0') | KeyCode::Backspace => self.clear_selected_tag(),
            KeyCode::Char('p') => self.cycle_project(1),
            KeyCode::Char('P') => self.cycle_project(-1),
            KeyCode::Char('d') => self.cycle_delivery(1),
            KeyCode::Char('D') => self.cycle_delivery(-1),
            KeyCode::Char(']') => self.cycle_review_target(1),
            KeyCode::Char('[') => self.cycle_review_target(-1),
            KeyCode::Char('g') => self.generate_prompt(),
            KeyCode::Char('y') => self.copy_prompt(),
            KeyCode::Char('x') => self.clear_prompt(),
            KeyCode::Char('r') => self.mode = AppMode::EditingReply,
            KeyCode::Char('v') => self.paste_reply_from_clipboard(),
            KeyCode::Char('X') => self.clear_reply(),
            KeyCode::Char('w') => {
                self.export_reply(true);
            }
            KeyCode::Char('W') => self.export_from_clipboard(),
            KeyCode::Char('c') => self.toggle_clipboard_watch(Instant::now()),
            KeyCode::Char('i') => self.open_path(self.workspace.input_dir(&self.selection())),
            KeyCode::Char('o') => self.open_path(self.workspace.output_dir(&self.selection())),
            KeyCode::Char('n') => self.open_notebook(),
            KeyCode::Enter => self.open_selected_file(),
            KeyCode::Char('R') | KeyCode::F(5) => {
                self.refresh();
                self.notify("✓ Refreshed");
            }
            _ => {}
        }
    }

    fn handle_reply_mode_input(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Esc => self.mode = AppMode::Normal,
            KeyCode::Enter => self.reply.push('\n'),
            KeyCode::Backspace => {
                self.reply.pop();
            }
            KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reply.push(c);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::testing::FakeClipboard;
    use crate::config::AppConfig;
    use std::fs;
    use std::path::Path;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn setup(dir: &Path, files: &[&str]) -> (ReviewApp, FakeClipboard) {
        let cfg = AppConfig {
            projects: vec!["Alpha".into(), "Beta".into()],
            deliveries: vec!["Final".into()],
            open_output_after_export: false,
            ..AppConfig::default()
        };
        let (ws, _) = Workspace::open(dir.join("base"), cfg, None).unwrap();
        let sel = ws.selection(None, None).unwrap();
        for f in files {
            fs::write(ws.input_dir(&sel).join(f), "content").unwrap();
        }
        let clip = FakeClipboard::default();
        let app = ReviewApp::new(ws, &sel, Box::new(clip.clone()));
        (app, clip)
    }

    fn reports(app: &ReviewApp) -> Vec<PathBuf> {
        report::recent_reports(&app.workspace.output_dir(&app.selection()), 10)
    }

    #[test]
    fn tagging_moves_files_out_of_the_inbox() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = setup(dir.path(), &["a.docx", "b.docx", "c.docx"]);
        assert_eq!(app.visible_entries().len(), 3);

        app.handle_key(key('1'));
        app.handle_key(key('3'));
        let inbox: Vec<&str> = app.visible_entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(inbox, vec!["c.docx"]);
        assert_eq!(app.review_target().as_deref(), Some("b.docx"));

        app.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        let tagged: Vec<(String, Option<Tag>)> = app
            .visible_entries()
            .iter()
            .map(|e| (e.name.clone(), e.tag))
            .collect();
        assert_eq!(
            tagged,
            vec![
                ("a.docx".to_string(), Some(Tag::Standard)),
                ("b.docx".to_string(), Some(Tag::PendingReview)),
            ]
        );

        app.handle_key(key('0'));
        assert_eq!(app.listing.find("a.docx").unwrap().tag, None);
    }

    #[test]
    fn prompt_needs_a_pending_review_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = setup(dir.path(), &["std.pdf", "draft.docx"]);

        app.handle_key(key('g'));
        assert!(app.popup.is_some());
        assert!(app.prompt.is_empty());
        app.handle_key(key('j')); // dismisses the popup only
        assert!(app.popup.is_none());
        assert_eq!(app.cursor, 0);

        // inbox order: draft.docx, std.pdf
        app.handle_key(key('3'));
        app.handle_key(key('1'));
        app.handle_key(key('g'));
        assert!(app.popup.is_none());
        assert!(app.prompt.contains("item by item: draft.docx"));
        assert!(app.prompt.contains("[Standard]\n- std.pdf"));
        assert!(app.prompt.contains("[Template]\n- (none)"));
    }

    #[test]
    fn watch_exports_new_replies_but_not_our_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, clip) = setup(dir.path(), &["draft.docx"]);
        app.handle_key(key('3'));
        app.handle_key(key('g'));
        app.handle_key(key('y'));
        assert_eq!(clip.text.borrow().as_deref(), Some(app.prompt.trim()));

        let start = Instant::now();
        app.toggle_clipboard_watch(start);
        app.tick(start);
        assert!(reports(&app).is_empty(), "own prompt must not become a report");

        clip.set("- clause 4 is missing\n- dates disagree");
        app.tick(start + Duration::from_millis(700));
        assert_eq!(reports(&app).len(), 1);
        assert!(app.reply.contains("clause 4"));
        assert!(app.last_report.is_some());

        app.tick(start + Duration::from_millis(1400));
        assert_eq!(reports(&app).len(), 1);

        app.toggle_clipboard_watch(start);
        clip.set("another reply");
        app.tick(start + Duration::from_secs(10));
        assert_eq!(reports(&app).len(), 1);
    }

    #[test]
    fn manual_export_validates_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, clip) = setup(dir.path(), &["draft.docx"]);

        app.handle_key(key('w'));
        assert_eq!(app.popup.as_ref().unwrap().severity, Severity::Warning);
        app.popup = None;

        app.reply = "some findings".to_string();
        app.handle_key(key('w'));
        assert!(app.popup.as_ref().unwrap().body.contains("pending-review"));
        app.popup = None;

        app.handle_key(key('3'));
        clip.set("findings from the clipboard");
        app.handle_key(key('W'));
        assert!(app.popup.is_none());
        assert_eq!(app.reply, "findings from the clipboard");
        assert_eq!(reports(&app).len(), 1);
    }

    #[test]
    fn reply_editing_and_paste() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = setup(dir.path(), &[]);

        app.handle_paste("  pasted reply \n");
        assert_eq!(app.reply, "pasted reply");

        app.handle_key(key('r'));
        assert_eq!(app.mode, AppMode::EditingReply);
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        app.handle_key(key('q'));
        app.handle_paste("!");
        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.reply, "pasted reply\nq!");
        assert!(!app.quit);

        app.handle_key(key('X'));
        assert!(app.reply.is_empty());
        app.handle_key(key('q'));
        assert!(app.quit);
    }

    #[test]
    fn switching_projects_changes_folders() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = setup(dir.path(), &["only-in-alpha.docx"]);
        assert_eq!(app.visible_entries().len(), 1);

        app.handle_key(key('p'));
        assert_eq!(app.selection().project, "Beta");
        assert!(app.visible_entries().is_empty());

        app.handle_key(key('P'));
        assert_eq!(app.selection().project, "Alpha");
        assert_eq!(app.visible_entries().len(), 1);
    }

    #[test]
    fn cursor_wraps_and_scrolls() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = setup(dir.path(), &["1.docx", "2.docx", "3.docx", "4.docx"]);
        app.list_viewport_height = 2;

        app.move_cursor(-1);
        assert_eq!(app.cursor, 3);
        assert_eq!(app.scroll_offset, 2);
        app.move_cursor(1);
        assert_eq!(app.cursor, 0);
        assert_eq!(app.scroll_offset, 0);
    }
}
