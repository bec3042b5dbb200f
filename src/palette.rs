use rand::Rng;

/// A solid background color. Kept independent of any terminal library so the
/// game logic stays headless; the UI converts to ratatui colors at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Blend towards white. Used for the deceptive flash: the result reads as
    /// "the same color, brighter", not as the round's target color.
    pub fn lighten(self, amount: f64) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let channel = |c: u8| -> u8 { (c as f64 + (255.0 - c as f64) * amount).round() as u8 };
        Self {
            r: channel(self.r),
            g: channel(self.g),
            b: channel(self.b),
        }
    }
}

/// The two colors a round moves between: `from` during the waiting phase,
/// `to` once the real trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub from: Rgb,
    pub to: Rgb,
}

const PALETTE: [Rgb; 8] = [
    Rgb::new(0xc0, 0x39, 0x2b), // red
    Rgb::new(0x27, 0xae, 0x60), // green
    Rgb::new(0x29, 0x80, 0xb9), // blue
    Rgb::new(0xf3, 0x9c, 0x12), // orange
    Rgb::new(0x8e, 0x44, 0xad), // purple
    Rgb::new(0x16, 0xa0, 0x85), // teal
    Rgb::new(0xd3, 0x54, 0x00), // pumpkin
    Rgb::new(0x2c, 0x3e, 0x50), // slate
];

/// Pick two distinct palette colors for a round.
pub fn pick_pair<R: Rng>(rng: &mut R) -> ColorPair {
    let from_idx = rng.gen_range(0..PALETTE.len());
    let mut to_idx = rng.gen_range(0..PALETTE.len() - 1);
    if to_idx >= from_idx {
        to_idx += 1;
    }
    ColorPair {
        from: PALETTE[from_idx],
        to: PALETTE[to_idx],
    }
}
