mod error;
mod execute;
mod font;
mod instruction;
mod interpreter;
mod loader;
mod machine;
mod quirks;
mod runner;
mod types;

pub use error::*;
pub use font::*;
pub use instruction::*;
pub use interpreter::*;
pub use loader::*;
pub use machine::*;
pub use quirks::*;
pub use runner::*;
pub use types::*;
