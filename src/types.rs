// Shared types module - colors and frame-level error values
use anyhow::Result;
use serde::{Deserialize, Deserializer};

// RGB color representation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            anyhow::bail!("Invalid hex color: {}", hex);
        }
        Ok(Rgb {
            r: u8::from_str_radix(&hex[0..2], 16)?,
            g: u8::from_str_radix(&hex[2..4], 16)?,
            b: u8::from_str_radix(&hex[4..6], 16)?,
        })
    }

    /// Scale each channel by `factor` in [0.0, 1.0].
    pub fn darken(self, factor: f64) -> Rgb {
        Rgb {
            r: (self.r as f64 * factor) as u8,
            g: (self.g as f64 * factor) as u8,
            b: (self.b as f64 * factor) as u8,
        }
    }

    /// Affine blend from `self` toward `other`; factor 0.0 = self, 1.0 = other.
    pub fn blend(self, other: Rgb, factor: f64) -> Rgb {
        let factor = factor.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| ((b as f64 - a as f64) * factor + a as f64) as u8;
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }

    /// Add `amount` to each channel, saturating at 255.
    pub fn brighten(self, amount: u8) -> Rgb {
        Rgb {
            r: self.r.saturating_add(amount),
            g: self.g.saturating_add(amount),
            b: self.b.saturating_add(amount),
        }
    }
}

// Config files write colors as hex strings
impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Rgb::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// A recoverable per-frame failure. The frame loop records the most recent one
// and surfaces its color as a single indicator pixel until a frame succeeds.
#[derive(Clone, Debug)]
pub struct TransientError {
    pub message: String,
    pub color: Rgb,
}

impl TransientError {
    pub fn new(message: impl Into<String>, color: Rgb) -> Self {
        TransientError {
            message: message.into(),
            color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        let c = Rgb::from_hex("#0000aa").unwrap();
        assert_eq!(c, Rgb::new(0, 0, 0xaa));
        assert!(Rgb::from_hex("12345").is_err());
        assert!(Rgb::from_hex("zzzzzz").is_err());
    }

    #[test]
    fn test_blend_endpoints() {
        let a = Rgb::new(0, 0, 255);
        let b = Rgb::new(0, 0, 170);
        assert_eq!(a.blend(b, 0.0), a);
        assert_eq!(a.blend(b, 1.0), b);
        // over-range factors clamp
        assert_eq!(a.blend(b, 2.5), b);
    }

    #[test]
    fn test_darken() {
        let c = Rgb::new(100, 200, 50);
        assert_eq!(c.darken(0.5), Rgb::new(50, 100, 25));
        assert_eq!(c.darken(0.0), BLACK);
    }
}
