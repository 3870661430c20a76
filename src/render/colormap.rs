//! Colormaps for the density layer.

use clap::ValueEnum;
use image::Rgba;

/// Stops of the `fire` gradient: dark blue held to 20 %, cream at the top.
const FIRE_STOPS: [(f32, [u8; 3]); 10] = [
    (0.00, [0x18, 0x2B, 0x4C]),
    (0.20, [0x0E, 0x25, 0x85]),
    (0.30, [0x0B, 0x23, 0x9B]),
    (0.40, [0x20, 0x1B, 0xA4]),
    (0.50, [0x2F, 0x1B, 0x89]),
    (0.60, [0x55, 0x17, 0x71]),
    (0.70, [0x9E, 0x0E, 0x3F]),
    (0.80, [0xD7, 0x15, 0x10]),
    (0.90, [0xFF, 0xCE, 0x63]),
    (1.00, [0xFF, 0xF7, 0xE1]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Colormap {
    Fire,
    /// Black through blue and purple to yellow and white.
    #[default]
    #[value(name = "gnuplot2")]
    Gnuplot2,
}

impl Colormap {
    /// Colour at `t` in `[0, 1]` (clamped), fully opaque.
    pub fn sample(&self, t: f32) -> Rgba<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let [r, g, b] = match self {
            Colormap::Fire => sample_stops(&FIRE_STOPS, t),
            Colormap::Gnuplot2 => gnuplot2(t),
        };
        Rgba([r, g, b, 255])
    }
}

fn sample_stops(stops: &[(f32, [u8; 3])], t: f32) -> [u8; 3] {
    for pair in stops.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            return [
                lerp(c0[0], c1[0], f),
                lerp(c0[1], c1[1], f),
                lerp(c0[2], c1[2], f),
            ];
        }
    }
    stops.last().map(|(_, c)| *c).unwrap_or([0, 0, 0])
}

fn lerp(a: u8, b: u8, f: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * f).round() as u8
}

fn gnuplot2(x: f32) -> [u8; 3] {
    let r = x / 0.32 - 0.78125;
    let g = 2.0 * x - 0.84;
    let b = if x < 0.25 {
        4.0 * x
    } else if x < 0.92 {
        -2.0 * x + 1.84
    } else {
        x / 0.08 - 11.5
    };
    [unit_to_u8(r), unit_to_u8(g), unit_to_u8(b)]
}

fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_hits_its_stops() {
        assert_eq!(Colormap::Fire.sample(0.0), Rgba([0x18, 0x2B, 0x4C, 255]));
        assert_eq!(Colormap::Fire.sample(0.8), Rgba([0xD7, 0x15, 0x10, 255]));
        assert_eq!(Colormap::Fire.sample(1.0), Rgba([0xFF, 0xF7, 0xE1, 255]));
        assert_eq!(Colormap::Fire.sample(7.0), Colormap::Fire.sample(1.0));
    }

    #[test]
    fn gnuplot2_runs_black_to_white() {
        assert_eq!(Colormap::Gnuplot2.sample(0.0), Rgba([0, 0, 0, 255]));
        assert_eq!(Colormap::Gnuplot2.sample(1.0), Rgba([255, 255, 255, 255]));
        // blue peaks at 0.25 before red or green start
        assert_eq!(Colormap::Gnuplot2.sample(0.25), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn parses_names() {
        assert_eq!(Colormap::from_str("FIRE", true), Ok(Colormap::Fire));
        assert_eq!(Colormap::from_str("gnuplot2", false), Ok(Colormap::Gnuplot2));
        assert!(Colormap::from_str("viridis", true).is_err());
    }
}
