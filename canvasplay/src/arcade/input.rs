use std::io::{self};
use std::time::Duration;

use canvasloop::engine::input::Key;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Clone, Debug, PartialEq)]
pub enum GameInput {
    Quit,
    Start,
    Restart,
    Stop,
    KeyDown(Key),
    KeyUp(Key),
    Resize(u16, u16),
}

fn game_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Up => Some(Key::W),
        KeyCode::Left => Some(Key::A),
        KeyCode::Down => Some(Key::S),
        KeyCode::Right => Some(Key::D),
        KeyCode::Char(c) => {
            let key = Key::from_char(c);
            [Key::W, Key::A, Key::S, Key::D]
                .contains(&key)
                .then_some(key)
        }
        _ => None,
    }
}

fn key_input(key: KeyEvent) -> Option<GameInput> {
    if key.kind == KeyEventKind::Release {
        return game_key(key.code).map(GameInput::KeyUp);
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(GameInput::Quit);
    }
    match key.code {
        KeyCode::Esc => Some(GameInput::Quit),
        KeyCode::Enter => Some(GameInput::Start),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'q' => Some(GameInput::Quit),
            ' ' => Some(GameInput::Start),
            'r' => Some(GameInput::Restart),
            'x' => Some(GameInput::Stop),
            _ => game_key(key.code).map(GameInput::KeyDown),
        },
        code => game_key(code).map(GameInput::KeyDown),
    }
}

/// Waits up to `timeout` for one terminal event.
pub fn handle_events(timeout: Duration) -> io::Result<Option<GameInput>> {
    if event::poll(timeout)? {
        match event::read()? {
            Event::Key(key) => return Ok(key_input(key)),
            Event::Resize(width, height) => return Ok(Some(GameInput::Resize(width, height))),
            _ => {}
        }
    }
    Ok(None)
}
