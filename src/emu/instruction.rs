use std::fmt;

use crate::u4;

/// One decoded 16-bit word.
///
/// Operand names follow the usual opcode notation: `x`/`y` register
/// nibbles, `n` a nibble, `nn` a byte and `nnn` a 12-bit address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0: every pixel off.
    ClearDisplay,
    /// 00EE: pop pc.
    Return,

    /// 1nnn
    Jump { nnn: u16 },
    /// 2nnn: push the next pc, then jump.
    Call { nnn: u16 },
    /// Bnnn: target is nnn + V0.
    JumpOffset { nnn: u16 },

    /// 3xnn: skip when Vx equals the byte.
    SkipEqImm { x: u4, nn: u8 },
    /// 4xnn: skip when Vx differs from the byte.
    SkipNeImm { x: u4, nn: u8 },
    /// 5xy0
    SkipEqReg { x: u4, y: u4 },
    /// 9xy0
    SkipNeReg { x: u4, y: u4 },

    /// 6xnn
    LoadImm { x: u4, nn: u8 },
    /// 7xnn: wrapping add, no carry flag.
    AddImm { x: u4, nn: u8 },

    /// 8xyN group, see [`AluOp`].
    Alu { x: u4, y: u4, op: AluOp },

    /// Annn
    LoadIndex { nnn: u16 },
    /// Fx1E: I += Vx.
    AddIndex { x: u4 },

    /// Cxnn: random byte masked with nn.
    Random { x: u4, nn: u8 },
    /// Dxyn: XOR an n-byte sprite at (Vx, Vy); VF reports erased pixels.
    Draw { x: u4, y: u4, n: u4 },

    /// Ex9E: skip while key Vx is held.
    SkipKeyDown { x: u4 },
    /// ExA1: skip while key Vx is released.
    SkipKeyUp { x: u4 },
    /// Fx0A: block until some key is down, then store it in Vx.
    WaitForKey { x: u4 },

    /// Fx07
    ReadDelayTimer { x: u4 },
    /// Fx15
    SetDelayTimer { x: u4 },
    /// Fx18
    SetSoundTimer { x: u4 },

    /// Fx29: point I at the glyph for the low nibble of Vx.
    LoadGlyph { x: u4 },
    /// Fx33: hundreds, tens, ones of Vx into memory at I.
    Bcd { x: u4 },
    /// Fx55: dump V0 through Vx starting at I.
    StoreRegs { x: u4 },
    /// Fx65: fill V0 through Vx starting at I.
    LoadRegs { x: u4 },

    /// Any word outside the instruction set, kept for reporting.
    Unknown(u16),
}

/// Operation selected by the low nibble of an 8xyN instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    /// 8xy0 - Vx = Vy
    Set,
    /// 8xy1 - Vx = Vx OR Vy
    Or,
    /// 8xy2 - Vx = Vx AND Vy
    And,
    /// 8xy3 - Vx = Vx XOR Vy
    Xor,
    /// 8xy4 - Vx = Vx + Vy, VF = carry
    Add,
    /// 8xy5 - Vx = Vx - Vy, VF = not borrow
    Sub,
    /// 8xy6 - Vx = Vx SHR 1, VF = bit shifted out
    ShiftRight,
    /// 8xy7 - Vx = Vy - Vx, VF = not borrow
    SubReverse,
    /// 8xyE - Vx = Vx SHL 1, VF = bit shifted out
    ShiftLeft,
}

impl Instruction {
    /// Decode a 16-bit instruction word.
    pub fn decode(word: u16) -> Self {
        let nibble = (
            ((word & 0xF000) >> 12) as u8,
            ((word & 0x0F00) >> 8) as u8,
            ((word & 0x00F0) >> 4) as u8,
            (word & 0x000F) as u8,
        );

        let x = u4::new(nibble.1);
        let y = u4::new(nibble.2);
        let n = u4::new(nibble.3);
        let nn = (word & 0x00FF) as u8;
        let nnn = word & 0x0FFF;

        match nibble {
            (0x0, 0x0, 0xE, 0x0) => Instruction::ClearDisplay,
            (0x0, 0x0, 0xE, 0xE) => Instruction::Return,
            (0x1, _, _, _) => Instruction::Jump { nnn },
            (0x2, _, _, _) => Instruction::Call { nnn },
            (0x3, _, _, _) => Instruction::SkipEqImm { x, nn },
            (0x4, _, _, _) => Instruction::SkipNeImm { x, nn },
            (0x5, _, _, 0x0) => Instruction::SkipEqReg { x, y },
            (0x6, _, _, _) => Instruction::LoadImm { x, nn },
            (0x7, _, _, _) => Instruction::AddImm { x, nn },
            (0x8, _, _, low) => match AluOp::from_nibble(low) {
                Some(op) => Instruction::Alu { x, y, op },
                None => Instruction::Unknown(word),
            },
            (0x9, _, _, 0x0) => Instruction::SkipNeReg { x, y },
            (0xA, _, _, _) => Instruction::LoadIndex { nnn },
            (0xB, _, _, _) => Instruction::JumpOffset { nnn },
            (0xC, _, _, _) => Instruction::Random { x, nn },
            (0xD, _, _, _) => Instruction::Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => Instruction::SkipKeyDown { x },
            (0xE, _, 0xA, 0x1) => Instruction::SkipKeyUp { x },
            (0xF, _, 0x0, 0x7) => Instruction::ReadDelayTimer { x },
            (0xF, _, 0x0, 0xA) => Instruction::WaitForKey { x },
            (0xF, _, 0x1, 0x5) => Instruction::SetDelayTimer { x },
            (0xF, _, 0x1, 0x8) => Instruction::SetSoundTimer { x },
            (0xF, _, 0x1, 0xE) => Instruction::AddIndex { x },
            (0xF, _, 0x2, 0x9) => Instruction::LoadGlyph { x },
            (0xF, _, 0x3, 0x3) => Instruction::Bcd { x },
            (0xF, _, 0x5, 0x5) => Instruction::StoreRegs { x },
            (0xF, _, 0x6, 0x5) => Instruction::LoadRegs { x },

            _ => Instruction::Unknown(word),
        }
    }
}

impl AluOp {
    fn from_nibble(low: u8) -> Option<Self> {
        Some(match low {
            0x0 => AluOp::Set,
            0x1 => AluOp::Or,
            0x2 => AluOp::And,
            0x3 => AluOp::Xor,
            0x4 => AluOp::Add,
            0x5 => AluOp::Sub,
            0x6 => AluOp::ShiftRight,
            0x7 => AluOp::SubReverse,
            0xE => AluOp::ShiftLeft,
            _ => return None,
        })
    }

    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Set => "LD",
            AluOp::Or => "OR",
            AluOp::And => "AND",
            AluOp::Xor => "XOR",
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::ShiftRight => "SHR",
            AluOp::SubReverse => "SUBN",
            AluOp::ShiftLeft => "SHL",
        }
    }
}

/// Disassembly in the conventional assembler syntax.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::ClearDisplay => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump { nnn } => write!(f, "JP {nnn:#05X}"),
            Instruction::Call { nnn } => write!(f, "CALL {nnn:#05X}"),
            Instruction::JumpOffset { nnn } => write!(f, "JP V0, {nnn:#05X}"),
            Instruction::SkipEqImm { x, nn } => write!(f, "SE V{x}, {nn:#04X}"),
            Instruction::SkipNeImm { x, nn } => write!(f, "SNE V{x}, {nn:#04X}"),
            Instruction::SkipEqReg { x, y } => write!(f, "SE V{x}, V{y}"),
            Instruction::SkipNeReg { x, y } => write!(f, "SNE V{x}, V{y}"),
            Instruction::LoadImm { x, nn } => write!(f, "LD V{x}, {nn:#04X}"),
            Instruction::AddImm { x, nn } => write!(f, "ADD V{x}, {nn:#04X}"),
            Instruction::Alu { x, y, op } => write!(f, "{} V{x}, V{y}", op.mnemonic()),
            Instruction::LoadIndex { nnn } => write!(f, "LD I, {nnn:#05X}"),
            Instruction::AddIndex { x } => write!(f, "ADD I, V{x}"),
            Instruction::Random { x, nn } => write!(f, "RND V{x}, {nn:#04X}"),
            Instruction::Draw { x, y, n } => write!(f, "DRW V{x}, V{y}, {}", n.get()),
            Instruction::SkipKeyDown { x } => write!(f, "SKP V{x}"),
            Instruction::SkipKeyUp { x } => write!(f, "SKNP V{x}"),
            Instruction::WaitForKey { x } => write!(f, "LD V{x}, K"),
            Instruction::ReadDelayTimer { x } => write!(f, "LD V{x}, DT"),
            Instruction::SetDelayTimer { x } => write!(f, "LD DT, V{x}"),
            Instruction::SetSoundTimer { x } => write!(f, "LD ST, V{x}"),
            Instruction::LoadGlyph { x } => write!(f, "LD F, V{x}"),
            Instruction::Bcd { x } => write!(f, "LD B, V{x}"),
            Instruction::StoreRegs { x } => write!(f, "LD [I], V{x}"),
            Instruction::LoadRegs { x } => write!(f, "LD V{x}, [I]"),
            Instruction::Unknown(word) => write!(f, "DW {word:#06X}"),
        }
    }
}
