use rand::{SeedableRng, rngs::StdRng};

use super::{ADDRESS_MASK, Instruction, Machine, Quirks, StepResult, VmError};

/// Where pc goes once an instruction has executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Advance to the following instruction.
    Next,
    /// Skip the following instruction.
    Skip,
    /// Transfer control to an absolute address.
    Jump(u16),
    /// Re-execute this instruction on the next cycle.
    Stay,
}

impl Flow {
    pub(crate) fn skip_if(condition: bool) -> Self {
        if condition { Flow::Skip } else { Flow::Next }
    }

    fn target(self, address: u16) -> u16 {
        let pc = match self {
            Flow::Next => address.wrapping_add(2),
            Flow::Skip => address.wrapping_add(4),
            Flow::Jump(target) => target,
            Flow::Stay => address,
        };
        pc & ADDRESS_MASK
    }
}

/// The fetch-decode-execute engine.
///
/// Holds only configuration and the random source; all machine state is
/// passed in on every call.
pub struct Interpreter {
    pub(crate) quirks: Quirks,
    pub(crate) rng: StdRng,
}

impl Interpreter {
    pub fn new(quirks: Quirks) -> Self {
        Self {
            quirks,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Interpreter whose random instruction yields a reproducible sequence.
    pub fn with_seed(quirks: Quirks, seed: u64) -> Self {
        Self {
            quirks,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    pub fn set_quirks(&mut self, quirks: Quirks) {
        self.quirks = quirks;
    }

    /// Executes a single cycle (fetch, decode, execute, advance).
    ///
    /// On error pc still points at the faulting instruction.
    pub fn step(&mut self, machine: &mut Machine) -> Result<StepResult, VmError> {
        let address = machine.pc;
        machine.opcode = machine.read_word(address);

        let instruction = Instruction::decode(machine.opcode);
        log::trace!("{address:#05X}: {:04X}  {instruction}", machine.opcode);

        let flow = self.execute(machine, instruction)?;
        machine.pc = flow.target(address);

        Ok(match (instruction, flow) {
            (Instruction::Draw { .. } | Instruction::ClearDisplay, _) => StepResult::Drew,
            (Instruction::WaitForKey { .. }, Flow::Stay) => StepResult::WaitingForKey,
            _ => StepResult::Continue,
        })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Quirks::default())
    }
}

#[cfg(test)]
mod tests {
    use super::Flow;

    #[test]
    fn flow_targets_stay_in_address_space() {
        assert_eq!(Flow::Next.target(0x200), 0x202);
        assert_eq!(Flow::Skip.target(0x200), 0x204);
        assert_eq!(Flow::Stay.target(0x200), 0x200);
        assert_eq!(Flow::Jump(0x1234).target(0x200), 0x234);
        assert_eq!(Flow::Skip.target(0xFFE), 0x002);
    }
}
