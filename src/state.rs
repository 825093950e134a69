use std::io;

use crate::error::{Fault, Result};
use crate::memory::{Chip8MemoryMap, CHIP8_PROGRAM_ADDR, CHIP8_STACK_TOP};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Whether the machine is executing or parked on an `FX0A` key read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    AwaitingKey,
}

/// All mutable architectural state of one machine. Owned by the caller and
/// handed to the interpreter for each step.
pub struct Chip8State {
    pub registers: [u8; 16],
    pub memory: Chip8MemoryMap,
    pub program_counter: u16,
    pub stack_pointer: u16,
    pub index_register: u16,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub keys: [bool; 16],
    pub run_state: RunState,
}

impl Default for Chip8State {
    fn default() -> Self {
        Self::new()
    }
}

impl Chip8State {
    pub fn new() -> Self {
        Self {
            registers: [0; 16],
            memory: Chip8MemoryMap::new(),
            program_counter: CHIP8_PROGRAM_ADDR,
            stack_pointer: CHIP8_STACK_TOP,
            index_register: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; 16],
            run_state: RunState::Running,
        }
    }

    /// load a program image at 0x200, returns its length
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        self.memory.load_program(reader)
    }

    pub fn register(&self, register_index: u8) -> u8 {
        self.registers[register_index as usize & 0xF]
    }

    pub fn register_mut(&mut self, register_index: u8) -> &mut u8 {
        &mut self.registers[register_index as usize & 0xF]
    }

    pub fn set_flag(&mut self, flag: u8) {
        self.registers[0xF] = flag;
    }

    pub fn set_key(&mut self, key: u8, down: bool) -> Result<()> {
        match self.keys.get_mut(key as usize) {
            Some(slot) => {
                *slot = down;
                Ok(())
            }
            None => Err(Fault::NoSuchKey(key)),
        }
    }

    pub fn set_keys(&mut self, keys: [bool; 16]) {
        self.keys = keys;
    }

    pub fn is_key_down(&self, key: u8) -> Option<bool> {
        self.keys.get(key as usize).copied()
    }

    /// lowest-numbered key that is down
    pub fn first_key_down(&self) -> Option<u8> {
        self.keys.iter().position(|&down| down).map(|k| k as u8)
    }

    /// 256 bytes, 64x32, one bit per pixel, msb is the leftmost pixel
    pub fn display(&self) -> &[u8] {
        self.memory.display()
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= DISPLAY_WIDTH || y >= DISPLAY_HEIGHT {
            return false;
        }
        let byte = self.display()[y * (DISPLAY_WIDTH / 8) + x / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn is_sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_awaiting_key(&self) -> bool {
        self.run_state == RunState::AwaitingKey
    }

    /// count both timers down by one, stopping at zero
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}
