/// Which register the 8xy6 / 8xyE shifts read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShiftSource {
    /// Vx = Vx shifted.
    #[default]
    Vx,
    /// Vx = Vy shifted, as on the COSMAC VIP.
    Vy,
}

/// What happens to sprite pixels that fall past the right or bottom edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpriteEdge {
    /// Pixels past the edge are dropped.
    #[default]
    Clip,
    /// Pixels past the edge reappear on the opposite side.
    Wrap,
}

/// How an unknown instruction word is handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownOpcodePolicy {
    /// Stop with [`VmError::UnknownOpcode`](super::VmError::UnknownOpcode).
    #[default]
    Fault,
    /// Log a warning and continue with the next instruction.
    Warn,
}

/// Behavior switches for instructions whose semantics differ between
/// historical interpreters.
///
/// `Quirks::default()` is the common modern behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Quirks {
    pub shift_source: ShiftSource,
    /// 8xy1/8xy2/8xy3 clear VF.
    pub logic_resets_vf: bool,
    /// Fx55/Fx65 leave I pointing past the last register transferred.
    pub load_store_increments_i: bool,
    /// Fx1E sets VF to 1 when I leaves the 12-bit address range, else 0.
    pub index_add_sets_vf: bool,
    pub sprite_edge: SpriteEdge,
    pub unknown_opcode: UnknownOpcodePolicy,
}

impl Quirks {
    /// Behavior of the original COSMAC VIP interpreter.
    pub fn cosmac() -> Self {
        Quirks {
            shift_source: ShiftSource::Vy,
            logic_resets_vf: true,
            load_store_increments_i: true,
            index_add_sets_vf: false,
            sprite_edge: SpriteEdge::Clip,
            unknown_opcode: UnknownOpcodePolicy::Fault,
        }
    }
}
