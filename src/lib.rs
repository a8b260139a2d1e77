//! A CHIP-8 virtual machine.
//!
//! [`emu`] holds the machine state, the interpreter and the frame runner;
//! [`debugger`] layers interactive commands on top of the runner and
//! [`config`] maps command line options onto both.

pub mod config;
pub mod debugger;
pub mod emu;
mod nibble;

pub use nibble::u4;
