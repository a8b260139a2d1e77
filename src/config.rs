use clap::Args;

use crate::emu::{
    DEFAULT_CYCLES_PER_FRAME, Interpreter, LoadError, Machine, Quirks, Runner, RunnerConfig,
    ShiftSource, SpriteEdge, UnknownOpcodePolicy,
};

/// Command line options shared by the front ends.
#[derive(Args, Debug, Clone)]
pub struct VmArgs {
    /// Instructions executed per 60Hz frame
    #[arg(long, default_value_t = DEFAULT_CYCLES_PER_FRAME)]
    pub cycles_per_frame: usize,

    /// Start from the original COSMAC VIP behavior instead of the modern one
    #[arg(long)]
    pub cosmac: bool,

    /// Shifts read Vy instead of Vx
    #[arg(long)]
    pub shift_vy: bool,

    /// OR, AND and XOR clear VF
    #[arg(long)]
    pub logic_resets_vf: bool,

    /// Register store/load leaves I past the last register
    #[arg(long)]
    pub increment_i: bool,

    /// ADD I, Vx sets VF when I leaves the 12-bit address range
    #[arg(long)]
    pub index_overflow: bool,

    /// Sprites wrap around screen edges instead of clipping
    #[arg(long)]
    pub wrap_sprites: bool,

    /// Skip unknown opcodes with a warning instead of stopping
    #[arg(long)]
    pub lenient: bool,

    /// Seed for the random number instruction
    #[arg(long)]
    pub seed: Option<u64>,
}

impl VmArgs {
    pub fn quirks(&self) -> Quirks {
        let mut quirks = if self.cosmac {
            Quirks::cosmac()
        } else {
            Quirks::default()
        };

        if self.shift_vy {
            quirks.shift_source = ShiftSource::Vy;
        }
        quirks.logic_resets_vf |= self.logic_resets_vf;
        quirks.load_store_increments_i |= self.increment_i;
        quirks.index_add_sets_vf |= self.index_overflow;
        if self.wrap_sprites {
            quirks.sprite_edge = SpriteEdge::Wrap;
        }
        if self.lenient {
            quirks.unknown_opcode = UnknownOpcodePolicy::Warn;
        }

        quirks
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            cycles_per_frame: self.cycles_per_frame,
            ..RunnerConfig::default()
        }
    }

    pub fn interpreter(&self) -> Interpreter {
        match self.seed {
            Some(seed) => Interpreter::with_seed(self.quirks(), seed),
            None => Interpreter::new(self.quirks()),
        }
    }

    /// A runner for a fresh machine holding `image`.
    pub fn build_runner(&self, image: &[u8]) -> Result<Runner, LoadError> {
        let machine = Machine::with_program(image)?;
        log::debug!("Quirks: {:?}", self.quirks());
        Ok(Runner::new(machine, self.interpreter(), self.runner_config()))
    }
}
