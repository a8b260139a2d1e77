pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;

/// A grid the size of the CHIP-8 screen, indexed as `[y][x]`.
pub type Display<T> = [[T; DISPLAY_X]; DISPLAY_Y];

/// Outcome of a single interpreter step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// The instruction completed and nothing observable outside registers changed.
    Continue,
    /// The framebuffer was written (draw or clear).
    Drew,
    /// A wait-for-key instruction found no key down; pc was left in place.
    WaitingForKey,
}
