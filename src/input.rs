use crossterm::event::{poll, read, Event, KeyCode};
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::Keymap;

/// map of characters typed at the keyboard to what the chip8 might expect
/// where '1' => 0x01 and 'a' => 0x0a
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('a', 0x0a),
    ('b', 0x0b),
    ('c', 0x0c),
    ('d', 0x0d),
    ('e', 0x0e),
    ('f', 0x0f),
];

/// ditto using left-hand side of qwerty keyboard
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals send a press (and key repeats) but never a release, so a key
/// counts as down for this long after the last event for it
const KEY_HOLD: Duration = Duration::from_millis(150);

/// the key states for one frame, and whether the user asked to stop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyPoll {
    pub keys: [bool; 16],
    pub quit: bool,
}

/// reads keypresses
pub trait Input {
    /// drain pending events and report which of the 16 keys are down now
    fn poll_keys(&mut self) -> Result<KeyPoll, io::Error>;
}

/// Tracks when each mapped key was last seen; the hold window decides
/// whether it is still down.
struct HeldKeys {
    keymap: HashMap<char, u8>,
    last_seen: [Option<Instant>; 16],
}

impl HeldKeys {
    fn new(keymap: Keymap) -> Self {
        let keymap = match keymap {
            Keymap::Conventional => HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            Keymap::Literal => HashMap::from(CHIP8_LITERAL_KEYMAP),
        };
        HeldKeys {
            keymap,
            last_seen: [None; 16],
        }
    }

    /// record a typed character, returns the chip-8 key it maps to
    fn press(&mut self, key: char, at: Instant) -> Option<u8> {
        let mapped = *self.keymap.get(&key.to_ascii_lowercase())?;
        self.last_seen[mapped as usize] = Some(at);
        Some(mapped)
    }

    fn states(&self, now: Instant) -> [bool; 16] {
        let mut keys = [false; 16];
        for (down, seen) in keys.iter_mut().zip(self.last_seen.iter()) {
            *down = matches!(seen, Some(t) if now.duration_since(*t) < KEY_HOLD);
        }
        keys
    }
}

/// Input from the terminal, via crossterm. Raw mode must already be on.
pub struct TermInput {
    held: HeldKeys,
}

impl TermInput {
    pub fn new(keymap: Keymap) -> Self {
        TermInput {
            held: HeldKeys::new(keymap),
        }
    }
}

impl Input for TermInput {
    fn poll_keys(&mut self) -> Result<KeyPoll, io::Error> {
        let mut quit = false;
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                match evt.code {
                    KeyCode::Char(key) => {
                        if self.held.press(key, Instant::now()).is_none() {
                            debug!("can't map {key:?} to a COSMAC key");
                        }
                    }
                    KeyCode::Esc => quit = true,
                    _ => debug!("ignoring key event {:?}", evt.code),
                }
            }
        }
        Ok(KeyPoll {
            keys: self.held.states(Instant::now()),
            quit,
        })
    }
}

/// dummy Input implementation for testing: plays back one frame per poll,
/// then reports quit
pub struct DummyInput {
    frames: Vec<[bool; 16]>,
    next: usize,
}

impl DummyInput {
    pub fn new(frames: &[[bool; 16]]) -> Self {
        DummyInput {
            frames: Vec::from(frames),
            next: 0,
        }
    }

    /// the same keys held forever
    pub fn holding(keys: &[u8]) -> Self {
        let mut frame = [false; 16];
        for &k in keys {
            frame[k as usize & 0xF] = true;
        }
        DummyInput {
            frames: vec![frame],
            next: 0,
        }
    }
}

impl Input for DummyInput {
    fn poll_keys(&mut self) -> Result<KeyPoll, io::Error> {
        // a single frame repeats; longer scripts run out and quit
        if self.frames.len() == 1 {
            return Ok(KeyPoll {
                keys: self.frames[0],
                quit: false,
            });
        }
        match self.frames.get(self.next) {
            Some(&keys) => {
                self.next += 1;
                Ok(KeyPoll { keys, quit: false })
            }
            None => Ok(KeyPoll {
                keys: [false; 16],
                quit: true,
            }),
        }
    }
}
