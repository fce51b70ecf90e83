mod app_logic;
mod app_state;
mod event_handler;
mod ui_renderer;

// The main function to run the TUI
pub use self::run_tui::run_review_ui;

// Terminal setup/teardown and the draw loop
mod run_tui {
    use super::app_logic::ReviewApp;
    use super::event_handler::handle_events;
    use super::ui_renderer::ui_frame;
    use crate::clipboard::SystemClipboard;
    use crate::workspace::{Selection, Workspace};
    use anyhow::Result;
    use crossterm::{
        event::{DisableBracketedPaste, EnableBracketedPaste},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::prelude::{CrosstermBackend, Terminal};
    use std::io::{self, Stdout};

    /// Runs the interactive screen until the user quits.
    pub fn run_review_ui(
        workspace: Workspace,
        selection: &Selection,
        startup_notice: Option<String>,
    ) -> Result<()> {
        let mut app = ReviewApp::new(workspace, selection, Box::new(SystemClipboard::default()));
        app.enable_folder_watch();
        if let Some(notice) = startup_notice {
            app.notify(notice);
        }

        let mut terminal = init_terminal()?;
        let outcome = run_loop(&mut terminal, &mut app);
        restore_terminal(terminal)?;
        tracing::info!("review screen closed");
        outcome
    }

    fn run_loop(
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        app: &mut ReviewApp,
    ) -> Result<()> {
        while !app.quit {
            terminal.draw(|frame| ui_frame(frame, app))?;
            handle_events(app)?;
        }
        Ok(())
    }

    fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        let backend = CrosstermBackend::new(stdout);
        Terminal::new(backend).map_err(Into::into)
    }

    fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        )?;
        terminal.show_cursor().map_err(Into::into)
    }
}
