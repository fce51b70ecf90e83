use crate::tags::Tag;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lmreview – tag review documents, prepare AI prompts, export replies to Word
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder holding the project tree (defaults to the executable's folder)
    #[arg(long, value_name = "DIR", global = true)]
    pub base: Option<PathBuf>,

    /// Extra TOML config layered over `<base>/lmreview.toml`
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Project to open (defaults to the first configured one)
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Delivery to open (defaults to the first configured one)
    #[arg(long, global = true)]
    pub delivery: Option<String>,

    /// Runs headless; without a command the interactive screen opens.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the files of the input folder and their tags
    List,

    /// Tag a file as standard, template or review
    Tag {
        /// File name inside the input folder
        file: String,
        /// standard | template | review
        tag: Tag,
    },

    /// Remove a file's tag
    Untag { file: String },

    /// Print (or copy) the review prompt
    Prompt {
        /// Pending-review file to review (defaults to the first one)
        #[arg(long)]
        target: Option<String>,
        /// Copy the prompt to the clipboard instead of printing it
        #[arg(long)]
        copy: bool,
    },

    /// Turn an AI reply into a Word report
    Export {
        #[arg(long)]
        target: Option<String>,
        /// Text file holding the reply
        #[arg(long, value_name = "TXT", conflicts_with = "clipboard", required_unless_present = "clipboard")]
        from: Option<PathBuf>,
        /// Take the reply from the clipboard
        #[arg(long)]
        clipboard: bool,
    },

    /// Watch the clipboard and export every new reply until interrupted
    Watch {
        #[arg(long)]
        target: Option<String>,
    },
}
