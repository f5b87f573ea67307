//! Operator input from the terminal
//!
//! Keys: Enter captures, Esc (or Ctrl+C, since raw mode swallows SIGINT)
//! aborts. Raw mode is held for as long as a `TerminalKeys` is alive.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, warn};

/// A key press as understood by the capture loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorKey {
    Capture,
    Abort,
    Other(String),
}

/// Anything that can deliver operator key presses
pub trait KeySource {
    /// Wait up to `timeout` for a key press
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<OperatorKey>>;
}

/// Asks the operator whether to keep going after a failure
pub trait OperatorPrompt {
    /// True to continue the session, false to abort it
    fn confirm_continue(&mut self, error: &dyn std::error::Error) -> bool;
}

/// Terminal keyboard in raw mode
pub struct TerminalKeys {
    _private: (),
}

impl TerminalKeys {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        debug!("terminal_raw_mode_enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(error = %e, "terminal_raw_mode_restore_failed");
        }
    }
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<OperatorKey>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(map_key(&key))),
            _ => Ok(None),
        }
    }
}

fn map_key(key: &KeyEvent) -> OperatorKey {
    match key.code {
        KeyCode::Enter => OperatorKey::Capture,
        KeyCode::Esc => OperatorKey::Abort,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => OperatorKey::Abort,
        other => OperatorKey::Other(format!("{:?}", other)),
    }
}

/// Yes/no prompt read from the terminal
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl OperatorPrompt for TerminalPrompt {
    fn confirm_continue(&mut self, error: &dyn std::error::Error) -> bool {
        let mut stderr = io::stderr();
        // \r\n: the terminal may be in raw mode
        let _ = write!(stderr, "\r\nAn error occurred: {}\r\nContinue? (y) yes / (n) no\r\n> ", error);
        let _ = stderr.flush();

        loop {
            let key = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, "prompt_read_failed");
                    return false;
                }
            };
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('s') => {
                    let _ = write!(stderr, "y\r\n");
                    return true;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    let _ = write!(stderr, "n\r\n");
                    return false;
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key() {
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(map_key(&enter), OperatorKey::Capture);

        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(map_key(&esc), OperatorKey::Abort);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&ctrl_c), OperatorKey::Abort);

        let c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert!(matches!(map_key(&c), OperatorKey::Other(_)));
    }
}
