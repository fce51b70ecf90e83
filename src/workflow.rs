use crate::cli::{Cli, Command};
use crate::clipboard::{self, ClipboardAccess, ClipboardWatcher, SystemClipboard};
use crate::errors::ReviewError;
use crate::file_scanner::Listing;
use crate::tags::Tag;
use crate::workspace::{Selection, Workspace};
use crate::{config, logging, prompt, report, tui, utils};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

// Prints the folder contents grouped the way the file panel shows them.
fn print_listing(workspace: &Workspace, sel: &Selection, listing: &Listing) {
    println!("{} / {}", sel.project, sel.delivery);
    println!("input:  {}", workspace.input_dir(sel).display());
    println!("output: {}", workspace.output_dir(sel).display());
    println!();

    let untagged: Vec<_> = listing.untagged().collect();
    println!("Untagged ({})", untagged.len());
    for entry in &untagged {
        println!("  • {}", entry.name);
    }
    for tag in Tag::ALL {
        let names = listing.names_with_tag(tag);
        if names.is_empty() {
            continue;
        }
        println!();
        println!("{} ({})", tag.label(), names.len());
        for name in names {
            println!("  • {}", name);
        }
    }

    let recent = report::recent_reports(&workspace.output_dir(sel), 5);
    if !recent.is_empty() {
        println!();
        println!("Recent reports");
        for path in recent {
            if let Some(name) = path.file_name() {
                println!("  • {}", name.to_string_lossy());
            }
        }
    }
}

fn run_prompt(
    workspace: &Workspace,
    sel: &Selection,
    target: Option<&str>,
    copy: bool,
) -> Result<()> {
    let listing = workspace.scan(sel)?;
    let target = prompt::resolve_target(&listing, target)?;
    let text = prompt::build_for_listing(&listing, &target);
    if copy {
        clipboard::copy_text_to_clipboard(text.clone())?;
        println!(
            "✅ Copied the prompt for {} (≈ {} tokens) to the clipboard.",
            target,
            utils::approx_tokens(&text)
        );
    } else {
        print!("{}", text);
    }
    Ok(())
}

fn run_export(
    workspace: &Workspace,
    sel: &Selection,
    target: Option<&str>,
    from: Option<&Path>,
    use_clipboard: bool,
) -> Result<()> {
    let content = match (from, use_clipboard) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("could not read reply from {}", path.display()))?,
        (None, true) => match SystemClipboard::default().read_text() {
            Some(text) => text,
            None => bail!("the clipboard holds no text"),
        },
        (None, false) => bail!("give --from <TXT> or --clipboard"),
    };
    // Same order as the report writer: an empty reply is reported before a missing target.
    if content.trim().is_empty() {
        return Err(ReviewError::EmptyReply.into());
    }
    let listing = workspace.scan(sel)?;
    let target = prompt::resolve_target(&listing, target)?;
    let path = report::export(&workspace.output_dir(sel), &target, &content)?;
    println!("✅ Word report written: {}", path.display());
    Ok(())
}

/// One poll of the headless watch. Returns the report written for a new reply.
fn watch_step(
    watcher: &mut ClipboardWatcher,
    source: &mut dyn ClipboardAccess,
    out_dir: &Path,
    target: &str,
    now: Instant,
) -> Option<PathBuf> {
    let text = watcher.poll(source, now)?;
    match report::export(out_dir, target, &text) {
        Ok(path) => {
            println!("✅ Word report written: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::error!("Word export failed: {}", e);
            eprintln!("⚠️ Word export failed: {}", e);
            None
        }
    }
}

// Headless version of the clipboard watch: poll, compare, export, forever.
fn run_watch(workspace: &Workspace, sel: &Selection, target: Option<&str>) -> Result<()> {
    let listing = workspace.scan(sel)?;
    let target = prompt::resolve_target(&listing, target)?;
    let cfg = workspace.config();
    let interval = Duration::from_millis(cfg.clipboard_poll_ms);
    let mut watcher = ClipboardWatcher::new(interval, cfg.min_reply_chars);
    let mut source = SystemClipboard::default();
    let out_dir = workspace.output_dir(sel);

    println!(
        "Watching the clipboard for replies about {} (Ctrl-C to stop)...",
        target
    );
    // A reply already on the clipboard counts as new, like in the interactive screen.
    watcher.enable(Instant::now());
    loop {
        watch_step(&mut watcher, &mut source, &out_dir, &target, Instant::now());
        thread::sleep(interval);
    }
}

/// Runs one headless subcommand against an opened workspace.
fn run_command(workspace: &Workspace, sel: &Selection, command: Command) -> Result<()> {
    match command {
        Command::List => {
            let listing = workspace.scan(sel)?;
            print_listing(workspace, sel, &listing);
            Ok(())
        }
        Command::Tag { file, tag } => {
            let name = workspace.tag_file(sel, &file, tag)?;
            println!("✅ {} tagged as {}", name, tag);
            Ok(())
        }
        Command::Untag { file } => {
            workspace.clear_tag(sel, &file)?;
            println!("✅ Cleared the tag of {}", file);
            Ok(())
        }
        Command::Prompt { target, copy } => run_prompt(workspace, sel, target.as_deref(), copy),
        Command::Export {
            target,
            from,
            clipboard,
        } => run_export(workspace, sel, target.as_deref(), from.as_deref(), clipboard),
        Command::Watch { target } => run_watch(workspace, sel, target.as_deref()),
    }
}

// Main orchestrator for the lmreview application logic.
pub fn run_lmreview(cli_args: Cli) -> Result<()> {
    // Step 1: Resolve the base folder and configuration.
    let requested_base = match &cli_args.base {
        Some(b) => b.clone(),
        None => utils::default_base_path()?,
    };
    let cfg = config::load(&requested_base, cli_args.config.as_deref())?;

    // Step 2: Create the folder tree, falling back to the user profile if needed.
    let (workspace, fallback) = Workspace::open(requested_base.clone(), cfg, utils::home_dir())?;

    // Step 3: Logging lives next to the workspace that was actually opened.
    let headless = cli_args.command.is_some();
    logging::init(&workspace.log_dir(), headless)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        base = %workspace.base().display(),
        "lmreview starting"
    );
    let startup_notice = fallback.map(|fb| {
        tracing::warn!(
            "{} is not writable, using {} instead",
            requested_base.display(),
            fb.display()
        );
        format!(
            "⚠ {} is not writable; using {}",
            requested_base.display(),
            fb.display()
        )
    });
    if headless {
        if let Some(notice) = &startup_notice {
            eprintln!("{}", notice);
        }
    }

    let sel = workspace.selection(cli_args.project.as_deref(), cli_args.delivery.as_deref())?;

    // Step 4: Dispatch to a headless command or the interactive screen.
    match cli_args.command {
        None => tui::run_review_ui(workspace, &sel, startup_notice),
        Some(command) => run_command(&workspace, &sel, command),
    }
}
