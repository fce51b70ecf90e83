use crate::config::{AppConfig, TagMode};
use crate::errors::{ReviewError, ReviewResult};
use crate::file_scanner::{self, Listing};
use crate::tags::{Tag, TagStore};
use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::Duration;

pub const FALLBACK_DIR_NAME: &str = "LMReview_Review";
const WRITE_PROBE: &str = ".lmreview-write-probe";
const STABLE_CHECKS: usize = 5;
const STABLE_INTERVAL: Duration = Duration::from_millis(100);

/// Active project/delivery pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub project: String,
    pub delivery: String,
}

/// Folder layout: `<base>/<project>/<delivery>/{input,output}`.
#[derive(Debug, Clone)]
pub struct Workspace {
    base: PathBuf,
    cfg: AppConfig,
}

impl Workspace {
    pub fn new(base: PathBuf, cfg: AppConfig) -> Self {
        Workspace { base, cfg }
    }

    /// Creates the folder tree under `base`, or under `<home>/LMReview_Review`
    /// when `base` cannot be written. The second value is set when the
    /// fallback was used.
    pub fn open(
        base: PathBuf,
        cfg: AppConfig,
        home: Option<PathBuf>,
    ) -> Result<(Workspace, Option<PathBuf>)> {
        let primary = Workspace::new(base, cfg);
        let err = match primary.ensure_structure() {
            Ok(()) => return Ok((primary, None)),
            Err(e) => e,
        };

        let Some(home) = home else {
            return Err(err).with_context(|| {
                format!(
                    "{} is not writable and no home folder is known",
                    primary.base.display()
                )
            });
        };
        let fallback_base = home.join(FALLBACK_DIR_NAME);
        let fallback = Workspace::new(fallback_base.clone(), primary.cfg);
        fallback.ensure_structure().with_context(|| {
            format!(
                "neither {} nor {} is writable (first error: {err})",
                primary.base.display(),
                fallback_base.display()
            )
        })?;
        Ok((fallback, Some(fallback_base)))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn project_root(&self, sel: &Selection) -> PathBuf {
        self.base.join(&sel.project).join(&sel.delivery)
    }

    pub fn input_dir(&self, sel: &Selection) -> PathBuf {
        self.project_root(sel).join(&self.cfg.input_folder)
    }

    pub fn output_dir(&self, sel: &Selection) -> PathBuf {
        self.project_root(sel).join(&self.cfg.output_folder)
    }

    pub fn selections(&self) -> impl Iterator<Item = Selection> + '_ {
        self.cfg.projects.iter().flat_map(|p| {
            self.cfg.deliveries.iter().map(move |d| Selection {
                project: p.clone(),
                delivery: d.clone(),
            })
        })
    }

    pub fn ensure_structure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base)?;
        let probe = self.base.join(WRITE_PROBE);
        fs::write(&probe, b"")?;
        fs::remove_file(&probe)?;
        for sel in self.selections() {
            fs::create_dir_all(self.input_dir(&sel))?;
            fs::create_dir_all(self.output_dir(&sel))?;
        }
        Ok(())
    }

    /// Resolves optional CLI names against the configured lists.
    pub fn selection(&self, project: Option<&str>, delivery: Option<&str>) -> Result<Selection> {
        let pick = |wanted: Option<&str>, choices: &[String], what: &str| -> Result<String> {
            match wanted {
                None => Ok(choices[0].clone()),
                Some(w) => match choices.iter().find(|c| c.as_str() == w) {
                    Some(c) => Ok(c.clone()),
                    None => bail!("unknown {what} '{w}' (configured: {})", choices.join(", ")),
                },
            }
        };
        Ok(Selection {
            project: pick(project, &self.cfg.projects, "project")?,
            delivery: pick(delivery, &self.cfg.deliveries, "delivery")?,
        })
    }

    /// Scans the input folder and drops sidecar entries for deleted files.
    pub fn scan(&self, sel: &Selection) -> Result<Listing> {
        let dir = self.input_dir(sel);
        let mut store = TagStore::load(&dir)?;
        let entries = file_scanner::scan_input_dir(&dir, &store)?;

        let existing: HashSet<String> = entries.iter().map(|e| e.name.clone()).collect();
        let dropped = store.prune(&existing);
        if dropped > 0 {
            tracing::info!(
                dropped,
                remaining = store.len(),
                store = %store.path().display(),
                "pruned tags of deleted files"
            );
            store.save()?;
        }
        Ok(Listing { entries })
    }

    /// Tags `name` and returns the file's (possibly new) name.
    pub fn tag_file(&self, sel: &Selection, name: &str, tag: Tag) -> ReviewResult<String> {
        let dir = self.input_dir(sel);
        let path = input_file(&dir, name)?;
        let mut store = TagStore::load(&dir)?;

        match self.cfg.tag_mode {
            TagMode::Sidecar => {
                store.set(name, tag);
                store.save()?;
                tracing::info!("tagged {} as {}", name, tag.key());
                Ok(name.to_string())
            }
            TagMode::Prefix => {
                if Tag::from_prefixed_name(name).is_some() {
                    return Err(ReviewError::TagLocked(name.to_string()));
                }
                let new_name = format!("{}{}", tag.marker(), name);
                let new_path = dir.join(&new_name);
                if new_path.exists() {
                    return Err(ReviewError::TargetExists(new_path));
                }
                wait_until_stable(&path);
                fs::rename(&path, &new_path).map_err(|e| match e.kind() {
                    ErrorKind::PermissionDenied => ReviewError::FileBusy(path.clone()),
                    _ => ReviewError::Io(e),
                })?;
                // The new prefix is the tag; an older sidecar entry would shadow it.
                if store.remove(name).is_some() {
                    store.save()?;
                }
                tracing::info!("tagged {} -> {}", name, new_name);
                Ok(new_name)
            }
        }
    }

    /// Removes a sidecar tag. Tags carried in the file name are left alone.
    pub fn clear_tag(&self, sel: &Selection, name: &str) -> ReviewResult<()> {
        let dir = self.input_dir(sel);
        input_file(&dir, name)?;
        let mut store = TagStore::load(&dir)?;
        if store.remove(name).is_some() {
            store.save()?;
            tracing::info!("cleared tag of {}", name);
            return Ok(());
        }
        if Tag::from_prefixed_name(name).is_some() {
            return Err(ReviewError::TagLocked(name.to_string()));
        }
        Ok(())
    }
}

/// Path of `name` inside `dir`. Only bare file names are accepted.
fn input_file(dir: &Path, name: &str) -> ReviewResult<PathBuf> {
    let mut components = Path::new(name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !plain || name.contains(['/', '\\']) {
        return Err(ReviewError::InvalidName(name.to_string()));
    }
    let path = dir.join(name);
    if !path.is_file() {
        return Err(ReviewError::FileNotFound(path));
    }
    Ok(path)
}

/// Waits briefly for a file that is still being copied in.
fn wait_until_stable(path: &Path) {
    for _ in 0..STABLE_CHECKS {
        let before = fs::metadata(path).map(|m| m.len());
        thread::sleep(STABLE_INTERVAL);
        let after = fs::metadata(path).map(|m| m.len());
        if let (Ok(a), Ok(b)) = (before, after) {
            if a == b {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(mode: TagMode) -> AppConfig {
        AppConfig {
            projects: vec!["Alpha".into()],
            deliveries: vec!["Final".into(), "Draft".into()],
            tag_mode: mode,
            ..AppConfig::default()
        }
    }

    fn open_in(dir: &Path, mode: TagMode) -> (Workspace, Selection) {
        let (ws, fallback) =
            Workspace::open(dir.join("base"), small_config(mode), None).unwrap();
        assert!(fallback.is_none());
        let sel = ws.selection(None, None).unwrap();
        (ws, sel)
    }

    #[test]
    fn creates_every_project_delivery_pair() {
        let dir = tempfile::tempdir().unwrap();
        let (ws, sel) = open_in(dir.path(), TagMode::Sidecar);
        assert_eq!(sel.project, "Alpha");
        assert_eq!(sel.delivery, "Final");
        for d in ["Final", "Draft"] {
            assert!(ws.base().join("Alpha").join(d).join("input").is_dir());
            assert!(ws.base().join("Alpha").join(d).join("output").is_dir());
        }
        assert!(!ws.base().join(WRITE_PROBE).exists());
        assert!(ws.selection(Some("Beta"), None).is_err());
        assert_eq!(
            ws.selection(None, Some("Draft")).unwrap().delivery,
            "Draft"
        );
    }

    #[test]
    fn falls_back_to_home_when_base_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the base folder should be cannot hold subfolders.
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "not a folder").unwrap();
        let home = dir.path().join("home");

        let (ws, fallback) =
            Workspace::open(blocked, small_config(TagMode::Sidecar), Some(home.clone())).unwrap();
        let expected = home.join(FALLBACK_DIR_NAME);
        assert_eq!(fallback.as_deref(), Some(expected.as_path()));
        assert_eq!(ws.base(), expected);
        assert!(expected.join("Alpha").join("Final").join("input").is_dir());
    }

    #[test]
    fn unusable_base_without_home_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "not a folder").unwrap();
        assert!(Workspace::open(blocked, small_config(TagMode::Sidecar), None).is_err());
    }

    #[test]
    fn sidecar_tags_round_trip_through_scan() {
        let dir = tempfile::tempdir().unwrap();
        let (ws, sel) = open_in(dir.path(), TagMode::Sidecar);
        let input = ws.input_dir(&sel);
        fs::write(input.join("spec.docx"), "s").unwrap();
        fs::write(input.join("draft.docx"), "d").unwrap();

        assert_eq!(ws.tag_file(&sel, "spec.docx", Tag::Standard).unwrap(), "spec.docx");
        ws.tag_file(&sel, "draft.docx", Tag::PendingReview).unwrap();
        ws.tag_file(&sel, "draft.docx", Tag::Template).unwrap();

        let listing = ws.scan(&sel).unwrap();
        assert_eq!(listing.find("spec.docx").unwrap().tag, Some(Tag::Standard));
        assert_eq!(listing.find("draft.docx").unwrap().tag, Some(Tag::Template));

        ws.clear_tag(&sel, "draft.docx").unwrap();
        assert_eq!(ws.scan(&sel).unwrap().find("draft.docx").unwrap().tag, None);

        assert!(matches!(
            ws.tag_file(&sel, "absent.docx", Tag::Standard),
            Err(ReviewError::FileNotFound(_))
        ));
    }

    #[test]
    fn deleted_files_drop_out_of_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let (ws, sel) = open_in(dir.path(), TagMode::Sidecar);
        let input = ws.input_dir(&sel);
        fs::write(input.join("old.docx"), "o").unwrap();
        ws.tag_file(&sel, "old.docx", Tag::Standard).unwrap();
        fs::remove_file(input.join("old.docx")).unwrap();

        let listing = ws.scan(&sel).unwrap();
        assert!(listing.entries.is_empty());
        assert!(TagStore::load(&input).unwrap().is_empty());
    }

    #[test]
    fn prefix_tag_replaces_an_older_sidecar_tag() {
        let dir = tempfile::tempdir().unwrap();
        let (sidecar_ws, sel) = open_in(dir.path(), TagMode::Sidecar);
        let input = sidecar_ws.input_dir(&sel);
        fs::write(input.join("plan.docx"), "p").unwrap();
        sidecar_ws.tag_file(&sel, "plan.docx", Tag::Standard).unwrap();

        let prefix_ws = Workspace::new(
            sidecar_ws.base().to_path_buf(),
            small_config(TagMode::Prefix),
        );
        let renamed = prefix_ws
            .tag_file(&sel, "plan.docx", Tag::PendingReview)
            .unwrap();
        assert_eq!(renamed, "【待審】plan.docx");

        let listing = prefix_ws.scan(&sel).unwrap();
        assert_eq!(listing.find(&renamed).unwrap().tag, Some(Tag::PendingReview));
        assert_eq!(listing.review_targets(), vec![renamed.clone()]);
        let store = TagStore::load(&input).unwrap();
        assert_eq!(store.get("plan.docx"), None);
        assert_eq!(store.get(&renamed), None);
    }

    #[test]
    fn names_outside_the_input_folder_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (ws, sel) = open_in(dir.path(), TagMode::Sidecar);
        // Exists one level up, next to the input folder.
        fs::write(ws.project_root(&sel).join("x.docx"), "x").unwrap();

        for name in ["../x.docx", "sub/x.docx", "..", "", "/etc/passwd"] {
            assert!(
                matches!(
                    ws.tag_file(&sel, name, Tag::Standard),
                    Err(ReviewError::InvalidName(_))
                ),
                "{name}"
            );
            assert!(matches!(
                ws.clear_tag(&sel, name),
                Err(ReviewError::InvalidName(_))
            ));
        }
        assert!(TagStore::load(&ws.input_dir(&sel)).unwrap().is_empty());
    }

    #[test]
    fn prefix_mode_renames_and_rejects_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let (ws, sel) = open_in(dir.path(), TagMode::Prefix);
        let input = ws.input_dir(&sel);
        fs::write(input.join("plan.docx"), "p").unwrap();
        fs::write(input.join("other.docx"), "o").unwrap();
        fs::write(input.join("【範本】other.docx"), "taken").unwrap();

        let renamed = ws.tag_file(&sel, "plan.docx", Tag::PendingReview).unwrap();
        assert_eq!(renamed, "【待審】plan.docx");
        assert!(input.join("【待審】plan.docx").is_file());
        assert!(!input.join("plan.docx").exists());

        assert!(matches!(
            ws.tag_file(&sel, "other.docx", Tag::Template),
            Err(ReviewError::TargetExists(_))
        ));
        assert!(matches!(
            ws.tag_file(&sel, "【待審】plan.docx", Tag::Standard),
            Err(ReviewError::TagLocked(_))
        ));
        assert!(matches!(
            ws.clear_tag(&sel, "【待審】plan.docx"),
            Err(ReviewError::TagLocked(_))
        ));

        let listing = ws.scan(&sel).unwrap();
        assert_eq!(listing.review_targets(), vec!["【待審】plan.docx".to_string()]);
    }
}
