//! # interpreter
//!
//! One call to `step` is one fetch/decode/execute cycle:
//!  1. fetch the big-endian word at PC (a PC past 0xffe is a fault)
//!  2. count the delay and sound timers down by one
//!  3. decode into group/X/Y/N/NN/NNN
//!  4. dispatch on the group; each group decides how far PC moves
//!
//! There is no loop in here. Blocking on `FX0A` is kept as `RunState` in the
//! machine and re-entered on the next call, so the caller's frame loop is the
//! only thing that makes progress.
//!
//! VF is always written after the result register, so `8FY4` and friends leave
//! the flag in VF rather than the sum.

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, trace};

use crate::config::{Quirks, ShiftSource, SpriteRows};
use crate::error::{Fault, Result};
use crate::instruction::Instruction;
use crate::memory::{
    MemoryMap, CHIP8_GLYPH_BYTES, CHIP8_RAM_SIZE_BYTES, CHIP8_STACK_BOTTOM, CHIP8_STACK_TOP,
};
use crate::state::{Chip8State, RunState, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// What a successful step did, beyond mutating the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Executed,
    /// `FX0A` is parked; PC has not moved
    AwaitingKey,
    /// `1NNN` jumped to itself. Advisory: the program is most likely done.
    InfiniteLoop { addr: u16 },
    /// a word with no defined behaviour. Unknown `8XY_`/`EX__` are stepped
    /// over; `0NNN` and unknown `FX__` leave PC where it is, so a program
    /// that runs off into zeroed memory stalls there
    Unimplemented { word: u16 },
}

pub struct Chip8Interpreter {
    quirks: Quirks,
    rng: StdRng,
}

impl Chip8Interpreter {
    pub fn new(quirks: Quirks) -> Self {
        Self {
            quirks,
            rng: StdRng::from_entropy(),
        }
    }

    /// deterministic `CXNN`, for tests and replays
    pub fn with_seed(quirks: Quirks, seed: u64) -> Self {
        Self {
            quirks,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    /// Run exactly one instruction. On `Err` the machine is as it was before
    /// the faulting instruction, apart from the timers.
    pub fn step(&mut self, state: &mut Chip8State) -> Result<Step> {
        let pc = state.program_counter;
        let instr = Instruction::from_word(state.memory.get_word(pc)?);
        state.tick_timers();
        trace!(
            "{pc:#05x}  {:04x}  {instr}  I={:03x} SP={:03x} V={:02x?}",
            instr.word,
            state.index_register,
            state.stack_pointer,
            state.registers
        );

        match instr.group {
            0x0 => self.system(state, instr),
            0x1 => {
                state.program_counter = instr.nnn;
                if pc == instr.nnn {
                    debug!("infinite loop detected at {pc:#05x}");
                    return Ok(Step::InfiniteLoop { addr: pc });
                }
                Ok(Step::Executed)
            }
            0x2 => self.call(state, instr),
            0x3 => skip_if(state.register(instr.x) == instr.nn, state),
            0x4 => skip_if(state.register(instr.x) != instr.nn, state),
            0x5 => skip_if(state.register(instr.x) == state.register(instr.y), state),
            0x6 => {
                *state.register_mut(instr.x) = instr.nn;
                advance(state)
            }
            0x7 => {
                let vx = state.register_mut(instr.x);
                *vx = vx.wrapping_add(instr.nn);
                advance(state)
            }
            0x8 => self.arithmetic(state, instr),
            0x9 => skip_if(state.register(instr.x) != state.register(instr.y), state),
            0xA => {
                state.index_register = instr.nnn;
                advance(state)
            }
            0xB => {
                let target = instr.nnn + state.register(0x0) as u16;
                if target as usize + 1 >= CHIP8_RAM_SIZE_BYTES {
                    return Err(Fault::AddressOutOfBounds {
                        addr: target,
                        len: 2,
                    });
                }
                state.program_counter = target;
                Ok(Step::Executed)
            }
            0xC => {
                *state.register_mut(instr.x) = self.rng.gen::<u8>() & instr.nn;
                advance(state)
            }
            0xD => self.draw(state, instr),
            0xE => self.keys(state, instr),
            _ => self.misc(state, instr),
        }
    }

    /// `00E0`, `00EE` and the machine-code call `0NNN`
    fn system(&mut self, state: &mut Chip8State, instr: Instruction) -> Result<Step> {
        match instr.word {
            0x00E0 => {
                state.memory.display_mut().fill(0);
                advance(state)
            }
            0x00EE => {
                let sp = state.stack_pointer;
                if sp < CHIP8_STACK_BOTTOM || sp + 2 > CHIP8_STACK_TOP {
                    return Err(Fault::StackUnderflow {
                        pc: state.program_counter,
                    });
                }
                let target = state.memory.get_word(sp)?;
                state.stack_pointer = sp + 2;
                state.program_counter = target;
                Ok(Step::Executed)
            }
            _ => Ok(unimplemented(state, instr, Pc::Stay)),
        }
    }

    fn call(&mut self, state: &mut Chip8State, instr: Instruction) -> Result<Step> {
        let pc = state.program_counter;
        let sp = state.stack_pointer;
        if sp < CHIP8_STACK_BOTTOM + 2 || sp > CHIP8_STACK_TOP {
            return Err(Fault::StackOverflow { pc, sp });
        }
        state.memory.put_word(sp - 2, pc + 2)?;
        state.stack_pointer = sp - 2;
        state.program_counter = instr.nnn;
        Ok(Step::Executed)
    }

    /// `8XY_`: register to register
    fn arithmetic(&mut self, state: &mut Chip8State, instr: Instruction) -> Result<Step> {
        let vx = state.register(instr.x);
        let vy = state.register(instr.y);
        let shifted = match self.quirks.shift_source {
            ShiftSource::Vx => vx,
            ShiftSource::Vy => vy,
        };

        let (result, flag) = match instr.n {
            0x0 => (vy, None),
            0x1 => (vx | vy, None),
            0x2 => (vx & vy, None),
            0x3 => (vx ^ vy, None),
            0x4 => {
                let sum = vx as u16 + vy as u16;
                (sum as u8, Some((sum > 0xFF) as u8))
            }
            0x5 => (vx.wrapping_sub(vy), Some((vx >= vy) as u8)),
            0x6 => (shifted >> 1, Some(shifted & 0x01)),
            0x7 => (vy.wrapping_sub(vx), Some((vy >= vx) as u8)),
            0xE => {
                let msb = shifted & 0x80;
                let flag = if self.quirks.raw_shift_flag {
                    msb
                } else {
                    msb >> 7
                };
                (shifted << 1, Some(flag))
            }
            _ => return Ok(unimplemented(state, instr, Pc::Advance)),
        };

        *state.register_mut(instr.x) = result;
        if let Some(flag) = flag {
            state.set_flag(flag);
        }
        advance(state)
    }

    /// `DXYN`: XOR an 8xN sprite from `memory[I..I+N]` onto the display at (VX, VY).
    /// Columns past 63 are dropped; rows past 31 are clipped or wrapped per
    /// `Quirks::sprite_rows`.
    fn draw(&mut self, state: &mut Chip8State, instr: Instruction) -> Result<Step> {
        let origin_x = state.register(instr.x) as usize;
        let origin_y = state.register(instr.y) as usize;
        let rows = instr.n as usize;

        let mut sprite = [0u8; 15];
        sprite[..rows].copy_from_slice(state.memory.get_ro_slice(state.index_register, rows)?);

        let sprite_rows = self.quirks.sprite_rows;
        let display = state.memory.display_mut();
        let mut collision = 0;
        for (i, &line) in sprite[..rows].iter().enumerate() {
            let y = match sprite_rows {
                SpriteRows::Clip if origin_y + i >= DISPLAY_HEIGHT => break,
                SpriteRows::Clip => origin_y + i,
                SpriteRows::Wrap => (origin_y + i) % DISPLAY_HEIGHT,
            };
            for bit in 0..8 {
                let x = origin_x + bit;
                if x >= DISPLAY_WIDTH {
                    break;
                }
                if line & (0x80 >> bit) == 0 {
                    continue;
                }
                let byte = &mut display[y * (DISPLAY_WIDTH / 8) + x / 8];
                let mask = 0x80 >> (x % 8);
                if *byte & mask != 0 {
                    collision = 1;
                }
                *byte ^= mask;
            }
        }

        state.set_flag(collision);
        advance(state)
    }

    /// `EX9E` / `EXA1`: read the key states directly, no waiting
    fn keys(&mut self, state: &mut Chip8State, instr: Instruction) -> Result<Step> {
        let key = state.register(instr.x);
        let down = state.is_key_down(key).ok_or(Fault::InvalidKey {
            x: instr.x,
            value: key,
        });
        match instr.nn {
            0x9E => skip_if(down?, state),
            0xA1 => skip_if(!down?, state),
            _ => Ok(unimplemented(state, instr, Pc::Advance)),
        }
    }

    /// `FX__`: timers, key wait, I arithmetic and register/memory transfer
    fn misc(&mut self, state: &mut Chip8State, instr: Instruction) -> Result<Step> {
        let x = instr.x as usize;
        let vx = state.register(instr.x);
        let i = state.index_register;

        match instr.nn {
            0x07 => *state.register_mut(instr.x) = state.delay_timer,
            0x0A => return Ok(self.await_key(state, instr)),
            0x15 => state.delay_timer = vx,
            0x18 => state.sound_timer = vx,
            0x1E => state.index_register = i.wrapping_add(vx as u16),
            0x29 => state.index_register = vx as u16 * CHIP8_GLYPH_BYTES,
            0x33 => state.memory.write(&[vx / 100, vx / 10 % 10, vx % 10], i)?,
            0x55 => {
                state.memory.write(&state.registers[..=x], i)?;
                state.index_register = i + x as u16 + 1;
            }
            0x65 => {
                let bytes = state.memory.get_ro_slice(i, x + 1)?;
                state.registers[..=x].copy_from_slice(bytes);
                state.index_register = i + x as u16 + 1;
            }
            _ => return Ok(unimplemented(state, instr, Pc::Stay)),
        }
        advance(state)
    }

    /// `FX0A` over two or more calls: the first parks the machine, later ones
    /// take the lowest key that is down, if any
    fn await_key(&mut self, state: &mut Chip8State, instr: Instruction) -> Step {
        match state.run_state {
            RunState::Running => {
                debug!("V{:X} waiting for a key", instr.x);
                state.run_state = RunState::AwaitingKey;
                Step::AwaitingKey
            }
            RunState::AwaitingKey => match state.first_key_down() {
                Some(key) => {
                    debug!("key {key:X} into V{:X}", instr.x);
                    *state.register_mut(instr.x) = key;
                    state.run_state = RunState::Running;
                    state.program_counter += 2;
                    Step::Executed
                }
                None => Step::AwaitingKey,
            },
        }
    }
}

fn advance(state: &mut Chip8State) -> Result<Step> {
    state.program_counter += 2;
    Ok(Step::Executed)
}

fn skip_if(condition: bool, state: &mut Chip8State) -> Result<Step> {
    if condition {
        state.program_counter += 2;
    }
    advance(state)
}

/// where PC goes after a word with no defined behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pc {
    Advance,
    Stay,
}

fn unimplemented(state: &mut Chip8State, instr: Instruction, pc: Pc) -> Step {
    debug!(
        "ignoring unimplemented instruction {:04x} at {:#05x}",
        instr.word, state.program_counter
    );
    if pc == Pc::Advance {
        state.program_counter += 2;
    }
    Step::Unimplemented { word: instr.word }
}
