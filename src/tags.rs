use crate::errors::{ReviewError, ReviewResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Review status of a document in the input folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "template")]
    Template,
    #[serde(rename = "review")]
    PendingReview,
}

impl Tag {
    pub const ALL: [Tag; 3] = [Tag::Standard, Tag::Template, Tag::PendingReview];

    pub fn label(self) -> &'static str {
        match self {
            Tag::Standard => "Standard",
            Tag::Template => "Template",
            Tag::PendingReview => "Pending review",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Tag::Standard => "standard",
            Tag::Template => "template",
            Tag::PendingReview => "review",
        }
    }

    /// File-name prefix used when tags live in the file name itself.
    pub fn marker(self) -> &'static str {
        match self {
            Tag::Standard => "【標準】",
            Tag::Template => "【範本】",
            Tag::PendingReview => "【待審】",
        }
    }

    /// Splits a legacy `【…】name` file name into its tag and the remainder.
    pub fn from_prefixed_name(name: &str) -> Option<(Tag, &str)> {
        Tag::ALL
            .iter()
            .find_map(|tag| name.strip_prefix(tag.marker()).map(|rest| (*tag, rest)))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tag {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "std" => Ok(Tag::Standard),
            "template" | "tpl" => Ok(Tag::Template),
            "review" | "pending" | "pending-review" => Ok(Tag::PendingReview),
            _ => Err(ReviewError::UnknownTag(s.to_string())),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    tags: BTreeMap<String, Tag>,
}

const STORE_VERSION: u32 = 1;

/// Sidecar mapping of file name to tag, kept next to the tagged files.
#[derive(Debug)]
pub struct TagStore {
    path: PathBuf,
    tags: BTreeMap<String, Tag>,
}

impl TagStore {
    pub const FILE_NAME: &'static str = ".lmreview-tags.json";

    /// Loads the store for `input_dir`. A missing sidecar is an empty store.
    pub fn load(input_dir: &Path) -> ReviewResult<Self> {
        let path = input_dir.join(Self::FILE_NAME);
        let tags = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => {
                let file: StoreFile = serde_json::from_str(&raw).map_err(|source| {
                    ReviewError::Store {
                        path: path.clone(),
                        source,
                    }
                })?;
                file.tags
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(TagStore { path, tags })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<Tag> {
        self.tags.get(name).copied()
    }

    pub fn set(&mut self, name: &str, tag: Tag) {
        self.tags.insert(name.to_string(), tag);
    }

    pub fn remove(&mut self, name: &str) -> Option<Tag> {
        self.tags.remove(name)
    }

    /// Drops entries whose file no longer exists. Returns how many were dropped.
    pub fn prune(&mut self, existing: &HashSet<String>) -> usize {
        let before = self.tags.len();
        self.tags.retain(|name, _| existing.contains(name));
        before - self.tags.len()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn save(&self) -> ReviewResult<()> {
        if self.is_empty() && !self.path.exists() {
            return Ok(());
        }
        let file = StoreFile {
            version: STORE_VERSION,
            tags: self.tags.clone(),
        };
        let raw = serde_json::to_string_pretty(&file).map_err(|source| ReviewError::Store {
            path: self.path.clone(),
            source,
        })?;
        // Write-then-rename so a crash never leaves a half-written sidecar.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), entries = self.tags.len(), "tag store saved");
        Ok(())
    }
}
