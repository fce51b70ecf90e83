use crate::tags::{Tag, TagStore};
use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub tag: Option<Tag>,
}

/// Office lock files, hidden files, temp files and our own sidecar never show up.
pub fn is_skip_file(name: &str) -> bool {
    name.starts_with("~$")
        || name.starts_with('.')
        || name.ends_with(".tmp")
        || name == TagStore::FILE_NAME
}

/// Lists the files directly inside `dir` (no recursion), classified by the
/// sidecar store first and the legacy name prefix second.
pub fn scan_input_dir(dir: &Path, store: &TagStore) -> Result<Vec<FileEntry>> {
    let mut entries: Vec<FileEntry> = Vec::new();
    if !dir.is_dir() {
        return Ok(entries);
    }

    let mut walker = WalkBuilder::new(dir);
    walker.standard_filters(false).max_depth(Some(1));

    for result in walker.build() {
        let dirent = match result {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("scan of {} hit an error: {}", dir.display(), e);
                continue;
            }
        };

        if dirent.depth() == 0 || !dirent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let name = dirent.file_name().to_string_lossy().into_owned();
        if is_skip_file(&name) {
            continue;
        }

        let tag = store
            .get(&name)
            .or_else(|| Tag::from_prefixed_name(&name).map(|(tag, _)| tag));
        entries.push(FileEntry {
            path: dirent.into_path(),
            name,
            tag,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Snapshot of one input folder, split the way the UI shows it.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub entries: Vec<FileEntry>,
}

impl Listing {
    pub fn untagged(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|e| e.tag.is_none())
    }

    pub fn with_tag(&self, tag: Tag) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(move |e| e.tag == Some(tag))
    }

    /// Tagged files grouped standard, template, pending review.
    pub fn tagged(&self) -> Vec<&FileEntry> {
        Tag::ALL.iter().flat_map(|tag| self.with_tag(*tag)).collect()
    }

    pub fn names_with_tag(&self, tag: Tag) -> Vec<String> {
        self.with_tag(tag).map(|e| e.name.clone()).collect()
    }

    pub fn review_targets(&self) -> Vec<String> {
        self.names_with_tag(Tag::PendingReview)
    }

    pub fn find(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn tagged_count(&self) -> usize {
        self.entries.iter().filter(|e| e.tag.is_some()).count()
    }

    pub fn untagged_count(&self) -> usize {
        self.entries.len() - self.tagged_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn skips_lock_hidden_tmp_and_sidecar_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["report.docx", "~$report.docx", ".DS_Store", "upload.tmp"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::write(
            dir.path().join(TagStore::FILE_NAME),
            r#"{"version":1,"tags":{}}"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("inner.docx"), "x").unwrap();

        let store = TagStore::load(dir.path()).unwrap();
        let entries = scan_input_dir(dir.path(), &store).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["report.docx"]);
    }

    #[test]
    fn classifies_by_sidecar_then_prefix() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.docx", "a.docx", "【待審】c.docx", "【標準】d.docx"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let mut store = TagStore::load(dir.path()).unwrap();
        store.set("b.docx", Tag::Template);
        store.set("【標準】d.docx", Tag::PendingReview);

        let entries = scan_input_dir(dir.path(), &store).unwrap();
        let listing = Listing { entries };
        assert_eq!(listing.entries[0].name, "a.docx");
        assert_eq!(listing.entries[0].tag, None);
        assert_eq!(listing.find("b.docx").unwrap().tag, Some(Tag::Template));
        assert_eq!(
            listing.review_targets(),
            vec!["【待審】c.docx".to_string(), "【標準】d.docx".to_string()]
        );
        assert_eq!(listing.untagged_count(), 1);
        assert_eq!(listing.tagged_count(), 3);

        let grouped: Vec<&str> = listing.tagged().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(grouped, vec!["b.docx", "【待審】c.docx", "【標準】d.docx"]);
    }

    #[test]
    fn missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TagStore::load(dir.path()).unwrap();
        let entries = scan_input_dir(&dir.path().join("absent"), &store).unwrap();
        assert!(entries.is_empty());
    }
}
