use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Rough estimate: GPT-style token ≈ 4 chars (good enough for UI)
pub fn approx_tokens(s: &str) -> usize {
    s.chars().count() / 4
}

/// Keeps both ends of a long path and elides the middle.
pub fn shorten_path(path: &str, max_len: usize) -> String {
    let chars: Vec<char> = path.chars().collect();
    if chars.len() <= max_len || max_len < 5 {
        return path.to_string();
    }
    let head = max_len / 2 - 2;
    let tail = max_len - head - 3;
    let head_part: String = chars[..head].iter().collect();
    let tail_part: String = chars[chars.len() - tail..].iter().collect();
    format!("{head_part}...{tail_part}")
}

pub fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

/// Directory holding the executable; falls back to the working directory.
pub fn default_base_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("could not locate the running executable")?;
    match exe.parent() {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("could not read the working directory"),
    }
}

/// Opens a folder or URL with the platform's default handler.
pub fn open_in_system(target: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    let mut cmd = Command::new("explorer");
    #[cfg(target_os = "macos")]
    let mut cmd = Command::new("open");
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut cmd = Command::new("xdg-open");

    cmd.arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("could not open {target}"))?;
    Ok(())
}

pub fn open_folder(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    open_in_system(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_paths_are_untouched() {
        assert_eq!(shorten_path("/tmp/input", 60), "/tmp/input");
    }

    #[test]
    fn long_paths_keep_both_ends() {
        let long = format!("/home/staff/{}/output", "x".repeat(80));
        let short = shorten_path(&long, 30);
        assert_eq!(short.chars().count(), 30);
        assert!(short.starts_with("/home/staff/x"));
        assert!(short.ends_with("/output"));
        assert!(short.contains("..."));
    }

    #[test]
    fn token_estimate() {
        assert_eq!(approx_tokens("abcdefgh"), 2);
        assert_eq!(approx_tokens(""), 0);
    }
}
