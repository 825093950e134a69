use crate::error::{Fault, Result};
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the machine's address space. Every access is range-checked, so
/// a bad address from a program turns into a `Fault` instead of a panic.
pub trait MemoryMap {
    /// write unknown len of data into memory at a particular address
    fn write_any(&mut self, reader: &mut impl io::Read, addr: u16) -> Result<usize> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        self.write(buf.as_slice(), addr)?;
        Ok(len)
    }

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<()> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// get a two-byte big-endian word (stack records, instructions)
    fn get_word(&self, addr: u16) -> Result<u16> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(((word[0] as u16) << 8) | (word[1] as u16))
    }

    /// put a two-byte big-endian word
    fn put_word(&mut self, addr: u16, word: u16) -> Result<()> {
        self.write(&word.to_be_bytes(), addr)
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8]>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8]>;
}

/// Defines the CHIP-8 memory map, 4K configuration:
///   0x0000-0x004f  hex digit glyphs
///   0x0050-0x01ff  interpreter (unused)
///   0x0200-0x0e9f  program
///   0x0ea0-0x0ecf  stack, grows downward from 0x0ed0
///   0x0ed0-0x0eff  work area / variables (unused)
///   0x0f00-0x0fff  display
///
/// the stack and display live in the same array as the program, so a
/// program that writes there really does corrupt them
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// lowest address a return record may occupy
pub const CHIP8_STACK_BOTTOM: u16 = 0x0ea0;

/// initial (empty) stack pointer
pub const CHIP8_STACK_TOP: u16 = 0x0ed0;

pub const CHIP8_DISPLAY_ADDR: u16 = 0x0f00;
pub const CHIP8_DISPLAY_BYTES: usize = 0x100;

pub const CHIP8_FONT_ADDR: u16 = 0x000;
/// each glyph is 5 rows of 8 pixels
pub const CHIP8_GLYPH_BYTES: u16 = 5;

impl MemoryMap for Chip8MemoryMap {
    /// the glyph table is never handed out for writing
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8]> {
        let a = addr as usize;
        let font = CHIP8_FONT_ADDR as usize..CHIP8_FONT_ADDR as usize + CHIP8_FONT.len();
        match self.bytes.get_mut(a..a + len) {
            Some(_) if len > 0 && a < font.end && font.start < a + len => {
                Err(Fault::GlyphTableWrite { addr, len })
            }
            Some(bytes) => Ok(bytes),
            None => Err(Fault::AddressOutOfBounds { addr, len }),
        }
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8]> {
        let a = addr as usize;
        self.bytes
            .get(a..a + len)
            .ok_or(Fault::AddressOutOfBounds { addr, len })
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Chip8MemoryMap {
    /// zeroed memory with the glyph table installed
    pub fn new() -> Self {
        let mut bytes = vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice();
        let font = CHIP8_FONT_ADDR as usize;
        bytes[font..font + CHIP8_FONT.len()].copy_from_slice(&CHIP8_FONT);
        Chip8MemoryMap { bytes }
    }

    /// load a CHIP-8 program at 0x200; an oversized image is rejected whole
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let mut image = Vec::new();
        reader.read_to_end(&mut image)?;
        let max = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;
        if image.len() > max {
            return Err(Fault::ProgramTooLarge {
                size: image.len(),
                max,
            });
        }
        self.write(&image, CHIP8_PROGRAM_ADDR)?;
        Ok(image.len())
    }

    /// the bit-packed display, a view of 0x0f00-0x0fff
    pub fn display(&self) -> &[u8] {
        let a = CHIP8_DISPLAY_ADDR as usize;
        &self.bytes[a..a + CHIP8_DISPLAY_BYTES]
    }

    pub fn display_mut(&mut self) -> &mut [u8] {
        let a = CHIP8_DISPLAY_ADDR as usize;
        &mut self.bytes[a..a + CHIP8_DISPLAY_BYTES]
    }

    /// the whole address space, read-only
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
