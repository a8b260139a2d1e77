use super::{DISPLAY_X, DISPLAY_Y, Display, FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, VmError};
use crate::u4;

pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START_ADDRESS: usize = 0x200;
pub const STACK_SIZE: usize = 16;

/// Mask applied to every address derived from `pc` or `I`.
pub const ADDRESS_MASK: u16 = (MEMORY_SIZE - 1) as u16;

/// Complete state of the virtual machine.
///
/// The machine owns no behavior besides small accessors; instructions are
/// applied to it by an [`Interpreter`](super::Interpreter). The keypad is the
/// only field meant to be written from outside, by the input front end.
#[derive(Clone, Debug)]
pub struct Machine {
    /// 4KB memory array, font at 0x000, program at 0x200
    pub memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels
    pub display: Display<bool>,

    /// Program counter: address of the next instruction to execute
    pub pc: u16,
    /// Index register: stored as-is, dereferenced modulo memory size
    pub i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub v: [u8; 16],
    /// Return addresses for nested subroutine calls
    pub stack: [u16; STACK_SIZE],
    /// Index of the next free stack slot
    pub sp: u8,

    /// Decrements at 60Hz until it reaches 0
    pub delay_timer: u8,
    /// Decrements at 60Hz, tone plays while non-zero
    pub sound_timer: u8,

    /// Keypad state: true = pressed
    pub keypad: [bool; 16],
    /// Last fetched instruction word
    pub opcode: u16,
}

impl Machine {
    /// A zeroed machine with the font installed and pc at the program start.
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);

        Machine {
            memory,
            display: [[false; DISPLAY_X]; DISPLAY_Y],
            pc: PROGRAM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: [0; STACK_SIZE],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: [false; 16],
            opcode: 0,
        }
    }

    /// Advances both timers by one 60Hz tick.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Returns true while the sound timer is running.
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad[key] = pressed;
    }

    pub fn is_key_pressed(&self, key: u4) -> bool {
        self.keypad[key]
    }

    /// Lowest-numbered key currently held down.
    pub fn first_pressed_key(&self) -> Option<u4> {
        u4::all().find(|&key| self.keypad[key])
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn pixel(&self, y: usize, x: usize) -> bool {
        self.display[y][x]
    }

    pub fn clear_display(&mut self) {
        self.display = [[false; DISPLAY_X]; DISPLAY_Y];
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        self.memory[usize::from(addr & ADDRESS_MASK)]
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.memory[usize::from(addr & ADDRESS_MASK)] = value;
    }

    /// Reads the big-endian instruction word at `addr`.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    /// Copies `len` bytes starting at `start`, wrapping at the end of memory.
    pub fn read_range(&self, start: u16, len: u16) -> Vec<u8> {
        (0..len)
            .map(|offset| self.read_byte(start.wrapping_add(offset)))
            .collect()
    }

    /// The active part of the call stack, oldest frame first.
    pub fn call_stack(&self) -> &[u16] {
        &self.stack[..usize::from(self.sp)]
    }

    /// Pushes a return address for the call instruction at `self.pc`.
    pub(crate) fn push_return(&mut self, ret: u16) -> Result<(), VmError> {
        let slot = self
            .stack
            .get_mut(usize::from(self.sp))
            .ok_or(VmError::StackOverflow { address: self.pc })?;

        *slot = ret;
        self.sp += 1;
        Ok(())
    }

    /// Pops the most recent return address for the return instruction at `self.pc`.
    pub(crate) fn pop_return(&mut self) -> Result<u16, VmError> {
        self.sp = self
            .sp
            .checked_sub(1)
            .ok_or(VmError::StackUnderflow { address: self.pc })?;

        Ok(self.stack[usize::from(self.sp)])
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
