use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chip8_vm::config::Config;
use chip8_vm::display::MonoTermDisplay;
use chip8_vm::environment::Environment;
use chip8_vm::input::TermInput;
use chip8_vm::sound::{Mute, SimpleBeep, Sound};
use chip8_vm::{disassemble, Chip8Interpreter, Chip8State};

#[derive(Debug, Parser)]
#[command(version, about = "CHIP-8 interpreter")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a program in the terminal. Esc quits.
    Run {
        rom: PathBuf,
        /// TOML file with quirks, keymap and speed
        #[arg(long, default_value = "chip8-vm.toml")]
        config: PathBuf,
        /// stop after this many steps
        #[arg(long)]
        steps: Option<u64>,
        /// override steps_per_second from the config
        #[arg(long)]
        rate: Option<f64>,
        #[arg(long)]
        mute: bool,
        /// write logs here; stdout belongs to the display
        #[arg(long, default_value = "chip8-vm.log")]
        log: PathBuf,
    },
    /// Print one line per instruction: address, bytes, mnemonic
    Disasm { rom: PathBuf },
    /// Show the display test card until a key is pressed
    TestCard,
    /// Print the settings `run` would use, as TOML
    Config {
        #[arg(long, default_value = "chip8-vm.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    match Args::parse().command {
        Command::Run {
            rom,
            config,
            steps,
            rate,
            mute,
            log,
        } => run(rom, config, steps, rate, mute, log),
        Command::Disasm { rom } => {
            let program = fs::read(&rom).with_context(|| format!("reading {}", rom.display()))?;
            for (addr, instr) in disassemble(&program) {
                let [hi, lo] = instr.word.to_be_bytes();
                println!("{addr:04x} {hi:02x} {lo:02x} {instr}");
            }
            Ok(())
        }
        Command::Config { config } => {
            let config =
                Config::load(&config).with_context(|| format!("loading {}", config.display()))?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::TestCard => with_terminal(|| {
            let mut display = MonoTermDisplay::new()?;
            display.test_card()?;
            crossterm::event::read()?;
            Ok(())
        }),
    }
}

fn run(
    rom: PathBuf,
    config: PathBuf,
    steps: Option<u64>,
    rate: Option<f64>,
    mute: bool,
    log: PathBuf,
) -> Result<()> {
    let log_file = File::create(&log).with_context(|| format!("creating {}", log.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let config =
        Config::load(&config).with_context(|| format!("loading {}", config.display()))?;
    info!("{config:?}");

    let mut state = Chip8State::new();
    let mut f = File::open(&rom).with_context(|| format!("opening {}", rom.display()))?;
    let len = state
        .load_program(&mut f)
        .with_context(|| format!("loading {}", rom.display()))?;
    info!("loaded {len} bytes from {}", rom.display());

    let interpreter = Chip8Interpreter::new(config.quirks);
    let rate = rate.unwrap_or(config.steps_per_second);

    with_terminal(|| {
        let mut display = MonoTermDisplay::new()?;
        let mut input = TermInput::new(config.keymap);
        let mut sound: Box<dyn Sound> = if mute {
            Box::new(Mute::new())
        } else {
            Box::new(SimpleBeep::new())
        };
        let mut env = Environment::new(
            state,
            interpreter,
            &mut display,
            &mut input,
            sound.as_mut(),
        )
        .with_rate(rate);
        let summary = env.main_loop(steps)?;
        info!("{summary:?}");
        Ok(())
    })
}

/// raw mode and the alternate screen for the duration of `f`, restored even
/// when it fails
fn with_terminal(f: impl FnOnce() -> Result<()>) -> Result<()> {
    terminal::enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), EnterAlternateScreen)?;
    let result = f();
    crossterm::execute!(std::io::stdout(), LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}
