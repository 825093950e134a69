//! # chip8-vm
//!
//! An interpreter for the CHIP-8 instruction set: 16 8-bit registers, a 4K
//! address space, a 64x32 monochrome display and a 16-key hex keypad.
//!
//! ## Design
//!
//! * the core is `Chip8State` (all mutable machine state) plus
//!   `Chip8Interpreter` (one fetch/decode/execute per `step` call)
//! * the display and the call stack live inside the 4K address space, as on
//!   the COSMAC VIP, so programs that scribble on them see the same results
//! * every address is range-checked; leaving the address space or the stack
//!   region is a `Fault`, never a panic
//! * no threads and no sleeping in the core. `FX0A` waits by parking the
//!   machine in `RunState::AwaitingKey` and being re-run on the next step
//! * timers count down once per step, so the caller sets the clock
//!
//! Model
//!
//! ```text
//! Environment
//!  |-- display, input, sound, config
//!  |-- interpreter(quirks)
//!  |-- state(memory)
//!  `-- main loop
//!       |-- keys = input.poll_keys()
//!       |-- interpreter.step(state)
//!       |-- display.draw(state.display()) if it changed
//!       |-- sound.update(state.sound_timer())
//!       `-- sleep until the next step is due
//! ```

pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod sound;
pub mod state;

pub use config::{Config, Quirks};
pub use error::{Fault, Result};
pub use instruction::{disassemble, Instruction};
pub use interpreter::{Chip8Interpreter, Step};
pub use state::{Chip8State, RunState};
