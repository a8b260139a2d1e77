/// Number of bytes in one glyph of the built-in font.
pub const FONT_GLYPH_SIZE: usize = 5;

/// Programs locate digit sprites with `I = digit * 5`, so the font starts at 0.
pub const FONT_START_ADDRESS: usize = 0x000;
pub const FONT_END_ADDRESS: usize = FONT_START_ADDRESS + FONT.len();

/// Hexadecimal digit sprites 0-F, one row per byte, high bit leftmost.
pub const FONT: [u8; FONT_GLYPH_SIZE * 16] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Address of the glyph for the low nibble of `digit`.
pub fn glyph_address(digit: u8) -> u16 {
    (FONT_START_ADDRESS + usize::from(digit & 0x0F) * FONT_GLYPH_SIZE) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs_are_five_bytes_apart() {
        assert_eq!(glyph_address(0x0), 0);
        assert_eq!(glyph_address(0xA), 50);
        assert_eq!(glyph_address(0xF), 75);
    }

    #[test]
    fn high_nibble_is_ignored() {
        assert_eq!(glyph_address(0x1A), glyph_address(0xA));
    }

    #[test]
    fn font_fills_reserved_region() {
        assert_eq!(FONT_END_ADDRESS, 0x50);
    }
}
