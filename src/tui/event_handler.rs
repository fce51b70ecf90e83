use super::app_logic::ReviewApp;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use std::time::{Duration, Instant};

pub(super) fn handle_events(app: &mut ReviewApp) -> Result<()> {
    if event::poll(Duration::from_millis(50))? {
        match event::read()? {
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                app.handle_key(key_event)
            }
            Event::Paste(text) => app.handle_paste(&text),
            _ => {}
        }
    }
    app.tick(Instant::now());
    Ok(())
}
