//! The frame loop: the only thing that calls `step`.
//!
//! Each iteration polls the keyboard, runs one instruction, then hands the
//! display buffer and sound timer to the host. Timers tick once per step, so
//! authentic timing means running at about 60 steps per second.

use std::io;

use spin_sleep::LoopHelper;
use tracing::{info, warn};

use crate::display::Display;
use crate::error::Fault;
use crate::input::Input;
use crate::interpreter::{Chip8Interpreter, Step};
use crate::memory::CHIP8_DISPLAY_BYTES;
use crate::sound::Sound;
use crate::state::Chip8State;

#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("machine fault: {0}")]
    Fault(#[from] Fault),
    #[error("host io: {0}")]
    Io(#[from] io::Error),
    #[error("sound: {0}")]
    Sound(String),
    #[error("display takes {actual}-byte frames, the machine draws {expected}")]
    DisplaySize { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// the input asked to stop
    Quit,
    /// the step budget ran out
    StepLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub reason: StopReason,
}

pub struct Environment<'a> {
    state: Chip8State,
    interpreter: Chip8Interpreter,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    steps_per_second: f64,
}

impl<'a> Environment<'a> {
    pub fn new(
        state: Chip8State,
        interpreter: Chip8Interpreter,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Self {
        Environment {
            state,
            interpreter,
            display,
            input,
            sound,
            steps_per_second: 60.0,
        }
    }

    /// A rate that is not a finite positive number runs unpaced.
    pub fn with_rate(mut self, steps_per_second: f64) -> Self {
        self.steps_per_second = steps_per_second;
        self
    }

    pub fn state(&self) -> &Chip8State {
        &self.state
    }

    pub fn into_state(self) -> Chip8State {
        self.state
    }

    /// Step until the input quits, `max_steps` runs out, or the machine
    /// faults. Advisory outcomes are logged when they change and otherwise
    /// ignored.
    pub fn main_loop(&mut self, max_steps: Option<u64>) -> Result<RunSummary, EnvironmentError> {
        let actual = self.display.get_display_size_bytes();
        if actual != CHIP8_DISPLAY_BYTES {
            return Err(EnvironmentError::DisplaySize {
                expected: CHIP8_DISPLAY_BYTES,
                actual,
            });
        }
        let mut pacer = (self.steps_per_second.is_finite() && self.steps_per_second > 0.0)
            .then(|| LoopHelper::builder().build_with_target_rate(self.steps_per_second));
        let mut last_frame: Option<Vec<u8>> = None;
        let mut reported: Option<Step> = None;
        let mut steps = 0;

        info!(
            "running at {} steps/s, limit {:?}",
            self.steps_per_second, max_steps
        );
        let reason = loop {
            if max_steps.is_some_and(|max| steps >= max) {
                break StopReason::StepLimit;
            }
            if let Some(pacer) = pacer.as_mut() {
                pacer.loop_start();
            }

            let poll = self.input.poll_keys()?;
            if poll.quit {
                break StopReason::Quit;
            }
            self.state.set_keys(poll.keys);

            let outcome = self.interpreter.step(&mut self.state).map_err(|fault| {
                warn!("stopping after {steps} steps: {fault}");
                fault
            })?;
            steps += 1;
            match outcome {
                Step::InfiniteLoop { .. } | Step::Unimplemented { .. } => {
                    if reported != Some(outcome) {
                        info!("{outcome:?} after {steps} steps");
                        reported = Some(outcome);
                    }
                }
                Step::Executed | Step::AwaitingKey => {}
            }

            let frame = self.state.display();
            if last_frame.as_deref() != Some(frame) {
                self.display.draw(frame)?;
                last_frame = Some(frame.to_vec());
            }
            self.sound
                .update(self.state.sound_timer())
                .map_err(|e| EnvironmentError::Sound(e.to_string()))?;

            if let Some(pacer) = pacer.as_mut() {
                pacer.loop_sleep();
            }
        };

        info!("stopped after {steps} steps: {reason:?}");
        Ok(RunSummary { steps, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quirks;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::sound::Mute;

    fn load(program: &[u8]) -> Chip8State {
        let mut state = Chip8State::new();
        let mut prog = program;
        state.load_program(&mut prog).unwrap();
        state
    }

    #[test]
    fn test_step_limit() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::holding(&[]);
        let mut sound = Mute::new();
        // draw glyph 0 then spin
        let state = load(&[0xD0, 0x05, 0x12, 0x02]);
        let mut env = Environment::new(
            state,
            Chip8Interpreter::with_seed(Quirks::default(), 1),
            &mut display,
            &mut input,
            &mut sound,
        )
        .with_rate(f64::INFINITY);
        let summary = env.main_loop(Some(10)).unwrap();
        assert_eq!(
            summary,
            RunSummary {
                steps: 10,
                reason: StopReason::StepLimit
            }
        );
        assert_eq!(env.state().program_counter, 0x202);
        drop(env);
        // the glyph went up on the first step and nothing changed after
        assert_eq!(display.frames, 1);
        assert_eq!(display.last[0], 0xF0);
    }

    #[test]
    fn test_quit_from_input() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[[false; 16], [false; 16], [false; 16]]);
        let mut sound = Mute::new();
        let mut env = Environment::new(
            load(&[0x12, 0x00]),
            Chip8Interpreter::with_seed(Quirks::default(), 1),
            &mut display,
            &mut input,
            &mut sound,
        )
        .with_rate(0.0);
        let summary = env.main_loop(None).unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.reason, StopReason::Quit);
    }

    #[test]
    fn test_key_wait_through_the_loop() {
        let mut display = DummyDisplay::new();
        let mut pressed = [false; 16];
        pressed[0xC] = true;
        let mut input = DummyInput::new(&[[false; 16], [false; 16], pressed]);
        let mut sound = Mute::new();
        let mut env = Environment::new(
            load(&[0xF3, 0x0A]),
            Chip8Interpreter::with_seed(Quirks::default(), 1),
            &mut display,
            &mut input,
            &mut sound,
        )
        .with_rate(0.0);
        env.main_loop(None).unwrap();
        let state = env.into_state();
        assert_eq!(state.register(3), 0xC);
        assert_eq!(state.program_counter, 0x202);
        assert!(!state.is_awaiting_key());
    }

    #[test]
    fn test_sound_follows_timer() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::holding(&[]);
        let mut sound = Mute::new();
        // V0 = 2; sound = V0; spin
        let mut env = Environment::new(
            load(&[0x60, 0x02, 0xF0, 0x18, 0x12, 0x04]),
            Chip8Interpreter::with_seed(Quirks::default(), 1),
            &mut display,
            &mut input,
            &mut sound,
        )
        .with_rate(0.0);
        env.main_loop(Some(6)).unwrap();
        drop(env);
        assert_eq!(sound.beeps, 1);
        assert!(!sound.is_beeping());
    }

    /// a display for some other machine
    struct WideDisplay;

    impl Display for WideDisplay {
        fn draw(&mut self, _data: &[u8]) -> Result<(), io::Error> {
            Ok(())
        }

        fn get_display_size_bytes(&self) -> usize {
            1024
        }
    }

    #[test]
    fn test_display_size_mismatch() {
        let mut display = WideDisplay;
        let mut input = DummyInput::holding(&[]);
        let mut sound = Mute::new();
        let mut env = Environment::new(
            load(&[0x12, 0x00]),
            Chip8Interpreter::with_seed(Quirks::default(), 1),
            &mut display,
            &mut input,
            &mut sound,
        )
        .with_rate(0.0);
        assert!(matches!(
            env.main_loop(Some(5)),
            Err(EnvironmentError::DisplaySize {
                expected: 256,
                actual: 1024
            })
        ));
        assert_eq!(env.state().program_counter, 0x200);
    }

    #[test]
    fn test_fault_stops_loop() {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::holding(&[]);
        let mut sound = Mute::new();
        let mut env = Environment::new(
            load(&[0x00, 0xEE]),
            Chip8Interpreter::with_seed(Quirks::default(), 1),
            &mut display,
            &mut input,
            &mut sound,
        )
        .with_rate(0.0);
        assert!(matches!(
            env.main_loop(Some(5)),
            Err(EnvironmentError::Fault(Fault::StackUnderflow { pc: 0x200 }))
        ));
    }
}
