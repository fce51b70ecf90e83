use crate::errors::{ReviewError, ReviewResult};
use chrono::{DateTime, Local};
use docx_rs::{
    AbstractNumbering, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat, Numbering,
    NumberingId, Paragraph, Run, SpecialIndentType, Start, Style, StyleType,
};
use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;
use walkdir::WalkDir;

static UNSAFE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("static pattern"));

const BULLET_MARKERS: [char; 4] = ['-', '•', '●', '*'];
const BULLET_NUMBERING: usize = 1;
const MAX_SUFFIX: usize = 1000;

pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(name, "_").into_owned()
}

pub fn report_file_name(target: &str, at: DateTime<Local>) -> String {
    format!(
        "Review_{}_{}.docx",
        sanitize_filename(target),
        at.format("%Y%m%d_%H%M%S")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Bullet(String),
    Paragraph(String),
}

/// Splits a pasted reply into document blocks. Blank lines are dropped.
pub fn parse_blocks(content: &str) -> Vec<Block> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            if line.starts_with('#') {
                let text = line.trim_start_matches('#').trim();
                return (!text.is_empty()).then(|| Block::Heading(text.to_string()));
            }
            if line.starts_with(BULLET_MARKERS) {
                let text = line.trim_start_matches(BULLET_MARKERS).trim();
                return (!text.is_empty()).then(|| Block::Bullet(text.to_string()));
            }
            Some(Block::Paragraph(line.to_string()))
        })
        .collect()
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn build_document(target: &str, content: &str) -> Docx {
    let bullets = AbstractNumbering::new(BULLET_NUMBERING).add_level(
        Level::new(
            0,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        )
        .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
    );

    let mut docx = Docx::new()
        .add_style(
            Style::new("Heading1", StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
        .add_style(
            Style::new("Heading2", StyleType::Paragraph)
                .name("Heading 2")
                .size(26)
                .bold(),
        )
        .add_abstract_numbering(bullets)
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
        .add_paragraph(text_paragraph(&format!("{target} review result")).style("Heading1"));

    for block in parse_blocks(content) {
        let paragraph = match block {
            Block::Heading(text) => text_paragraph(&text).style("Heading2"),
            Block::Bullet(text) => text_paragraph(&text).numbering(
                NumberingId::new(BULLET_NUMBERING),
                IndentLevel::new(0),
            ),
            Block::Paragraph(text) => text_paragraph(&text),
        };
        docx = docx.add_paragraph(paragraph);
    }
    docx
}

/// Creates the report file without ever replacing an existing one.
fn create_unique(output_dir: &Path, file_name: &str) -> ReviewResult<(PathBuf, File)> {
    let stem = file_name.trim_end_matches(".docx");
    for n in 1..=MAX_SUFFIX {
        let candidate = if n == 1 {
            output_dir.join(file_name)
        } else {
            output_dir.join(format!("{stem}_{n}.docx"))
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ReviewError::Report(format!(
        "too many reports named {file_name} in {}",
        output_dir.display()
    )))
}

/// Writes the reply as `<output_dir>/Review_<target>_<timestamp>.docx`.
pub fn export(output_dir: &Path, target: &str, content: &str) -> ReviewResult<PathBuf> {
    if content.trim().is_empty() {
        return Err(ReviewError::EmptyReply);
    }
    if target.trim().is_empty() {
        return Err(ReviewError::NoTarget);
    }
    fs::create_dir_all(output_dir)?;

    let (path, file) = create_unique(output_dir, &report_file_name(target, Local::now()))?;
    if let Err(e) = build_document(target, content).build().pack(file) {
        let _ = fs::remove_file(&path);
        return Err(ReviewError::Report(e.to_string()));
    }
    tracing::info!("report written: {}", path.display());
    Ok(path)
}

/// Most recently modified `.docx` files in `output_dir`, newest first.
pub fn recent_reports(output_dir: &Path, limit: usize) -> Vec<PathBuf> {
    let mut found: Vec<(SystemTime, PathBuf)> = WalkDir::new(output_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "docx"))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((modified, e.into_path()))
        })
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    found.into_iter().take(limit).map(|(_, p)| p).collect()
}
