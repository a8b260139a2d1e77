use clap::{Parser, Subcommand, ValueEnum};
use clap_num::maybe_hex;

use crate::emu::{FrameReport, Instruction, VmError};
use crate::u4;

#[derive(Parser)]
#[command(multicall = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Command {
    /// Run continuously until paused or a breakpoint is hit
    #[command(visible_alias = "r")]
    Run,

    /// Stop continuous execution
    #[command(visible_alias = "p")]
    Pause,

    /// Execute instructions one at a time, timers untouched
    #[command(visible_alias = "s")]
    Step {
        #[arg(default_value = "1", value_parser = maybe_hex::<u32>)]
        count: u32,
    },

    /// Execute one whole frame, including the timer tick
    #[command(visible_alias = "f")]
    Frame,

    #[command(visible_alias = "b")]
    Breakpoint {
        #[command(subcommand)]
        action: BreakpointAction,
    },

    /// Overwrite a register, I, pc or a timer
    Set {
        #[arg(value_parser = parse_set_target)]
        target: SetTarget,
        #[arg(value_parser = maybe_hex::<u16>)]
        value: u16,
    },

    /// Dump memory
    #[command(visible_alias = "m")]
    Mem {
        #[arg(default_value = "0x200", value_parser = maybe_hex::<u16>)]
        start: u16,
        #[arg(default_value = "64", value_parser = maybe_hex::<u16>)]
        len: u16,
    },

    /// Disassemble instructions, starting at pc by default
    #[command(visible_alias = "d")]
    Disasm {
        #[arg(value_parser = maybe_hex::<u16>)]
        start: Option<u16>,
        #[arg(default_value = "16", value_parser = maybe_hex::<u16>)]
        count: u16,
    },

    /// Press or release a keypad key
    #[command(visible_alias = "k")]
    Key {
        #[arg(value_parser = parse_key)]
        key: u4,
        state: KeyState,
    },

    #[command(visible_alias = "q")]
    Quit,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum BreakpointAction {
    #[command(visible_alias = "s")]
    Set {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "c")]
    Clear {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "l")]
    List,

    #[command(visible_alias = "ca")]
    ClearAll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetTarget {
    V(u4),
    I,
    Pc,
    DelayTimer,
    SoundTimer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyState {
    Down,
    Up,
}

pub enum CommandResult {
    Ok,
    Stepped { cycles: u32, pc: u16 },
    Frame(FrameReport),
    Breakpoints(Vec<u16>),
    MemDump { offset: u16, data: Vec<u8> },
    Disasm { instructions: Vec<(u16, u16, Instruction)> },
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Error while executing cpu instruction: {0}")]
    Vm(#[from] VmError),
    #[error("Value {value:#X} out of range for {target:?}")]
    ValueOutOfRange { target: SetTarget, value: u16 },
}

fn parse_set_target(s: &str) -> Result<SetTarget, String> {
    let lower = s.to_lowercase();

    match lower.as_str() {
        "index" | "i" => Ok(SetTarget::I),
        "pc" => Ok(SetTarget::Pc),
        "dt" | "delay" => Ok(SetTarget::DelayTimer),
        "st" | "sound" => Ok(SetTarget::SoundTimer),

        _ if lower.starts_with('v') => match u8::from_str_radix(&lower[1..], 16) {
            Ok(reg) if reg < 16 => Ok(SetTarget::V(u4::new(reg))),
            _ => Err(format!("Invalid register: '{s}'")),
        },

        _ => Err(format!("Unknown set target: '{s}'")),
    }
}

fn parse_key(s: &str) -> Result<u4, String> {
    u8::from_str_radix(s.trim_start_matches("0x"), 16)
        .ok()
        .and_then(|key| u4::try_from(key).ok())
        .ok_or_else(|| format!("Invalid key: '{s}', expected 0-F"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Cli::try_parse_from(line.split_whitespace()).unwrap().command
    }

    #[test]
    fn aliases_and_defaults() {
        assert_eq!(parse("s"), Command::Step { count: 1 });
        assert_eq!(parse("step 0x10"), Command::Step { count: 16 });
        assert_eq!(
            parse("m"),
            Command::Mem {
                start: 0x200,
                len: 64
            }
        );
        assert_eq!(
            parse("d"),
            Command::Disasm {
                start: None,
                count: 16
            }
        );
    }

    #[test]
    fn set_targets() {
        assert_eq!(
            parse("set vA 0x7f"),
            Command::Set {
                target: SetTarget::V(u4::new(0xA)),
                value: 0x7F
            }
        );
        assert_eq!(
            parse("set dt 30"),
            Command::Set {
                target: SetTarget::DelayTimer,
                value: 30
            }
        );
        assert!(Cli::try_parse_from(["set", "vg", "1"]).is_err());
        assert!(Cli::try_parse_from(["set", "v10", "1"]).is_err());
    }

    #[test]
    fn key_command() {
        assert_eq!(
            parse("k f down"),
            Command::Key {
                key: u4::new(0xF),
                state: KeyState::Down
            }
        );
        assert!(Cli::try_parse_from(["key", "10", "up"]).is_err());
    }

    #[test]
    fn breakpoint_subcommands() {
        assert_eq!(
            parse("b s 0x20A"),
            Command::Breakpoint {
                action: BreakpointAction::Set { addr: 0x20A }
            }
        );
        assert_eq!(
            parse("breakpoint ca"),
            Command::Breakpoint {
                action: BreakpointAction::ClearAll
            }
        );
    }
}
