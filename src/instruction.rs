//! Instruction decoding, shared by the interpreter and the disassembler.
//!
//! Register placeholders: X and Y are the second and third nibbles and name a
//! register V0-VF. N, NN and NNN are immediates of 4, 8 and 12 bits.

use std::fmt;

use crate::memory::CHIP8_PROGRAM_ADDR;

/// A fetched instruction word split into its fields. Decoding never touches
/// machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub word: u16,
    /// high nibble, selects the opcode group
    pub group: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl Instruction {
    pub fn decode(hi: u8, lo: u8) -> Self {
        Self {
            word: ((hi as u16) << 8) | lo as u16,
            group: hi >> 4,
            x: hi & 0x0F,
            y: lo >> 4,
            n: lo & 0x0F,
            nn: lo,
            nnn: (((hi & 0x0F) as u16) << 8) | lo as u16,
        }
    }

    pub fn from_word(word: u16) -> Self {
        let [hi, lo] = word.to_be_bytes();
        Self::decode(hi, lo)
    }

    /// mnemonic and operand text, `None` for words outside the instruction set
    fn parts(&self) -> Option<(&'static str, String)> {
        let Self { x, y, n, nn, nnn, .. } = *self;
        let vxvy = || format!("V{x:X},V{y:X}");
        let vxnn = || format!("V{x:X},#${nn:02x}");
        let vx = || format!("V{x:X}");
        let part = match self.group {
            0x0 => match self.word {
                0x00E0 => ("CLS", String::new()),
                0x00EE => ("RTN", String::new()),
                _ => ("CMC", format!("${nnn:03x}")),
            },
            0x1 => ("JMP", format!("${nnn:03x}")),
            0x2 => ("CALL", format!("${nnn:03x}")),
            0x3 => ("SKIP.EQ", vxnn()),
            0x4 => ("SKIP.NE", vxnn()),
            0x5 => ("SKIP.EQ", vxvy()),
            0x6 => ("MOV", vxnn()),
            0x7 => ("ADD", vxnn()),
            0x8 => {
                let cmd = match n {
                    0x0 => "MOV",
                    0x1 => "OR",
                    0x2 => "AND",
                    0x3 => "XOR",
                    0x4 => "ADD",
                    0x5 => "SUB",
                    0x6 => "RSHFT",
                    0x7 => "BSUB",
                    0xE => "LSHFT",
                    _ => return None,
                };
                (cmd, vxvy())
            }
            0x9 => ("SKIP.NE", vxvy()),
            0xA => ("MVI", format!("I,${nnn:03x}")),
            0xB => ("JUMP", format!("V0+${nnn:03x}")),
            0xC => ("RANDMASK", vxnn()),
            0xD => ("DRAW", format!("V{x:X},V{y:X},#${n:01x}")),
            0xE => match nn {
                0x9E => ("SKIP.KEY", vx()),
                0xA1 => ("SKIP.NKEY", vx()),
                _ => return None,
            },
            _ => {
                let cmd = match nn {
                    0x07 => "DELAY.GET",
                    0x0A => "KEY.GET",
                    0x15 => "DELAY.SET",
                    0x18 => "SOUND.SET",
                    0x1E => "I.ADD",
                    0x29 => "SPRITE.GET",
                    0x33 => "BCD",
                    0x55 => "REG.DUMP",
                    0x65 => "REG.LOAD",
                    _ => return None,
                };
                (cmd, vx())
            }
        };
        Some(part)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parts() {
            Some((cmd, operands)) if operands.is_empty() => write!(f, "{cmd}"),
            Some((cmd, operands)) => write!(f, "{cmd:<10} {operands}"),
            None => write!(f, "{:<10} {:04x}", "UNKNOWN", self.word),
        }
    }
}

/// Walk a program image as it would sit in memory, two bytes at a time.
/// A trailing odd byte is not an instruction and is skipped.
pub fn disassemble(program: &[u8]) -> impl Iterator<Item = (u16, Instruction)> + '_ {
    program.chunks_exact(2).enumerate().map(|(i, pair)| {
        let addr = CHIP8_PROGRAM_ADDR + (i as u16) * 2;
        (addr, Instruction::decode(pair[0], pair[1]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fields() {
        let i = Instruction::decode(0xD1, 0x25);
        assert_eq!(i.word, 0xD125);
        assert_eq!(i.group, 0xD);
        assert_eq!(i.x, 0x1);
        assert_eq!(i.y, 0x2);
        assert_eq!(i.n, 0x5);
        assert_eq!(i.nn, 0x25);
        assert_eq!(i.nnn, 0x125);
    }

    #[test]
    fn test_from_word_matches_decode() {
        assert_eq!(Instruction::from_word(0xA2F0), Instruction::decode(0xA2, 0xF0));
    }

    #[test]
    fn test_mnemonics() {
        let text = |w| Instruction::from_word(w).to_string();
        assert_eq!(text(0x00E0), "CLS");
        assert_eq!(text(0x00EE), "RTN");
        assert_eq!(text(0x0123), "CMC        $123");
        assert_eq!(text(0x2ABC), "CALL       $abc");
        assert_eq!(text(0x6A0F), "MOV        VA,#$0f");
        assert_eq!(text(0x8AB7), "BSUB       VA,VB");
        assert_eq!(text(0xA200), "MVI        I,$200");
        assert_eq!(text(0xB300), "JUMP       V0+$300");
        assert_eq!(text(0xD015), "DRAW       V0,V1,#$5");
        assert_eq!(text(0xE3A1), "SKIP.NKEY  V3");
        assert_eq!(text(0xF50A), "KEY.GET    V5");
    }

    #[test]
    fn test_unknown_words() {
        assert_eq!(Instruction::from_word(0x812F).to_string(), "UNKNOWN    812f");
        assert_eq!(Instruction::from_word(0xE100).to_string(), "UNKNOWN    e100");
        assert_eq!(Instruction::from_word(0xF0FF).to_string(), "UNKNOWN    f0ff");
    }

    #[test]
    fn test_disassemble_addresses() {
        let listing: Vec<_> = disassemble(&[0x60, 0x0A, 0x61, 0x05, 0x80]).collect();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].0, 0x200);
        assert_eq!(listing[1].0, 0x202);
        assert_eq!(listing[1].1.word, 0x6105);
    }
}
