//! Highlight colours for byte ranges.
//!
//! Six base hues, each stepped through six shades, give 36 colours that stay distinguishable
//! next to each other in the hex view. A node's colour is picked by its id so the same field
//! gets the same colour every time a file is opened.

const BASES: [u32; 6] = [0xCC_29_29, 0xC7_CC_29, 0x29_CC_32, 0x29_BE_CC, 0x3B_29_CC, 0xCC_29_B5];
const STEPS: [u32; 3] = [0x1C_00, 0x1C_00_00, 0x1C];
const SHADES: [u32; 6] = [0, 1, 2, 3, 4, 5];

/// Number of distinct highlight colours.
pub const PALETTE_SIZE: usize = BASES.len() * SHADES.len();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// A 24-bit colour.
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    const fn from_u32(value: u32) -> Self {
        let [_, r, g, b] = value.to_be_bytes();
        Self { r, g, b }
    }
}

/// Colour number `index` of the palette, wrapping around.
#[must_use]
pub fn color(index: usize) -> Rgb {
    let index = index % PALETTE_SIZE;
    let hue = index / SHADES.len();
    let shade = index % SHADES.len();
    let step = STEPS[hue % STEPS.len()] * SHADES[shade];
    // odd hues step down, even hues step up
    let value = if hue % 2 == 0 {
        BASES[hue] + step
    } else {
        BASES[hue] - step
    };
    Rgb::from_u32(value)
}
