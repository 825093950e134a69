use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

use crate::memory::{CHIP8_DISPLAY_BYTES, CHIP8_FONT, CHIP8_GLYPH_BYTES};
use crate::state::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Display is handed the machine's bit-packed display buffer after a step.
/// It should abstract the implementation details, so a variety of kinds of
/// screen would work.
pub trait Display {
    /// draw data based on internal resolution of display
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error>;

    /// how big the display data should be
    fn get_display_size_bytes(&self) -> usize;
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn byte_count(&self) -> usize {
        self.pixel_count() / 8
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel whose bit equals `bitplane`
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let mut count = self.pixel_count();
        let w = self.0;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let bit = 1 & (data[count / 8] >> (7 - count % 8));
                if bit == bitplane {
                    return Some((
                        (count % w) as f64,        // x
                        -1.0 * (count / w) as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// A frame for checking a display by eye: a one-pixel border, the sixteen
/// hex glyphs in two rows of eight, and a checkerboard along the bottom.
pub fn test_card_frame() -> [u8; CHIP8_DISPLAY_BYTES] {
    const ROW_BYTES: usize = DISPLAY_WIDTH / 8;
    let glyph_rows = CHIP8_GLYPH_BYTES as usize;
    let mut card = [0u8; CHIP8_DISPLAY_BYTES];

    for (y, row) in card.chunks_exact_mut(ROW_BYTES).enumerate() {
        if y == 0 || y == DISPLAY_HEIGHT - 1 {
            row.fill(0xff);
            continue;
        }
        if y >= 17 {
            let pattern = if y % 2 == 0 { 0xaa } else { 0x55 };
            row.fill(pattern);
        }
        row[0] |= 0x80;
        row[ROW_BYTES - 1] |= 0x01;
    }

    // glyphs sit one pixel in from the left edge of each byte column
    for glyph in 0..16 {
        let top = if glyph < 8 { 2 } else { 9 };
        let column = glyph % 8;
        let font = &CHIP8_FONT[glyph * glyph_rows..(glyph + 1) * glyph_rows];
        for (i, &line) in font.iter().enumerate() {
            card[(top + i) * ROW_BYTES + column] |= line >> 1;
        }
    }
    card
}

/// monochrome display in a terminal, rendered using TUI and crossterm.
/// the caller is responsible for raw mode / alternate screen
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
        })
    }

    pub fn test_card(&mut self) -> Result<(), io::Error> {
        self.draw(&test_card_frame())
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        if data.len() != self.resolution.byte_count() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "display buffer is {} bytes, expected {}",
                    data.len(),
                    self.resolution.byte_count()
                ),
            ));
        }

        // one terminal cell per chip-8 pixel, plus the border
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );
        let lit: Vec<_> = self.resolution.bitplane_from_data(data, 1).collect();
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();

        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &lit,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }

    fn get_display_size_bytes(&self) -> usize {
        self.resolution.byte_count()
    }
}

/// useful for testing non-display routines; remembers the last frame
#[derive(Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last: Vec<u8>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        self.frames += 1;
        self.last.clear();
        self.last.extend_from_slice(data);
        Ok(())
    }

    fn get_display_size_bytes(&self) -> usize {
        CHIP8_DISPLAY_BYTES
    }
}
