use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "lmreview.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// Tags live in a JSON sidecar inside the input folder.
    #[default]
    Sidecar,
    /// Tags are written into the file name as a `【…】` prefix.
    Prefix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub notebook_url: String,
    pub projects: Vec<String>,
    pub deliveries: Vec<String>,
    pub input_folder: String,
    pub output_folder: String,
    pub tag_mode: TagMode,
    pub clipboard_poll_ms: u64,
    pub min_reply_chars: usize,
    pub open_output_after_export: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            notebook_url: "https://notebooklm.google.com/".to_string(),
            projects: vec![
                "Cloud".to_string(),
                "Integration".to_string(),
                "Trod".to_string(),
            ],
            deliveries: vec!["Contract".to_string(), "Other".to_string()],
            input_folder: "input".to_string(),
            output_folder: "output".to_string(),
            tag_mode: TagMode::Sidecar,
            clipboard_poll_ms: 700,
            min_reply_chars: 1,
            open_output_after_export: true,
        }
    }
}

impl AppConfig {
    fn validate(&self) -> Result<()> {
        if self.projects.is_empty() {
            bail!("config: `projects` must name at least one project");
        }
        if self.deliveries.is_empty() {
            bail!("config: `deliveries` must name at least one delivery");
        }
        if self.input_folder.trim().is_empty() || self.output_folder.trim().is_empty() {
            bail!("config: `input_folder` and `output_folder` must not be empty");
        }
        if self.input_folder == self.output_folder {
            bail!("config: `input_folder` and `output_folder` must differ");
        }
        if self.clipboard_poll_ms < 100 {
            bail!(
                "config: `clipboard_poll_ms` is {} but must be at least 100",
                self.clipboard_poll_ms
            );
        }
        Ok(())
    }
}

/// Layers `<base>/lmreview.toml`, an explicit `--config` file and `LMREVIEW_*`
/// environment variables over the built-in defaults.
pub fn load(base: &Path, explicit: Option<&Path>) -> Result<AppConfig> {
    let mut settings = config::Config::builder()
        .add_source(config::File::from(base.join(CONFIG_FILE_NAME)).required(false));
    if let Some(p) = explicit {
        settings = settings.add_source(config::File::from(p).required(true));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("LMREVIEW")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("projects")
            .with_list_parse_key("deliveries"),
    );

    let cfg: AppConfig = settings.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_without_any_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load(dir.path(), None).unwrap();
        assert_eq!(cfg.tag_mode, TagMode::Sidecar);
        assert_eq!(cfg.clipboard_poll_ms, 700);
        assert_eq!(cfg.input_folder, "input");
        assert_eq!(cfg.projects.len(), 3);
    }

    #[test]
    fn base_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
projects = ["Alpha"]
deliveries = ["Final", "Draft"]
tag_mode = "prefix"
clipboard_poll_ms = 1500
"#,
        )
        .unwrap();

        let cfg = load(dir.path(), None).unwrap();
        assert_eq!(cfg.projects, vec!["Alpha".to_string()]);
        assert_eq!(cfg.deliveries.len(), 2);
        assert_eq!(cfg.tag_mode, TagMode::Prefix);
        assert_eq!(cfg.clipboard_poll_ms, 1500);
        assert_eq!(cfg.output_folder, "output");
    }

    #[test]
    fn explicit_file_wins_and_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "min_reply_chars = 5\n").unwrap();
        let explicit = dir.path().join("custom.toml");
        fs::write(&explicit, "min_reply_chars = 40\n").unwrap();
        let cfg = load(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(cfg.min_reply_chars, 40);

        fs::write(&explicit, "clipboard_poll_ms = 10\n").unwrap();
        assert!(load(dir.path(), Some(&explicit)).is_err());

        assert!(load(dir.path(), Some(&dir.path().join("absent.toml"))).is_err());
    }
}
