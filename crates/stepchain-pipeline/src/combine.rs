//! Two-image arithmetic and bitwise logic.
//!
//! Both inputs must have the same dimensions; the step layer checks this
//! and passes the image through otherwise. Only the color channels are
//! combined. The result keeps the first image's alpha.

use std::fmt;
use std::str::FromStr;

use crate::types::Image;

/// Per-channel arithmetic between two images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArithmeticOp {
    /// Saturating `a + b`.
    #[default]
    Add,
    /// Saturating `a - b`.
    Subtract,
    /// `a * b / 255`.
    Multiply,
    /// `|a - b|`.
    Difference,
    /// `a * (1 - weight) + b * weight`.
    Blend,
}

impl ArithmeticOp {
    /// Names accepted by [`FromStr`].
    pub const NAMES: &'static [&'static str] =
        &["add", "subtract", "multiply", "difference", "blend"];
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Difference => "difference",
            Self::Blend => "blend",
        };
        f.write_str(name)
    }
}

impl FromStr for ArithmeticOp {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            "multiply" => Ok(Self::Multiply),
            "difference" => Ok(Self::Difference),
            "blend" => Ok(Self::Blend),
            other => Err(format!("unknown arithmetic op '{other}'")),
        }
    }
}

/// Per-channel bitwise logic between two images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicOp {
    /// `a & b`.
    #[default]
    And,
    /// `a | b`.
    Or,
    /// `a ^ b`.
    Xor,
}

impl LogicOp {
    /// Names accepted by [`FromStr`].
    pub const NAMES: &'static [&'static str] = &["and", "or", "xor"];
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        };
        f.write_str(name)
    }
}

impl FromStr for LogicOp {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            "xor" => Ok(Self::Xor),
            other => Err(format!("unknown logic op '{other}'")),
        }
    }
}

/// Combine `a` and `b` with `op`. `weight` is only used by
/// [`ArithmeticOp::Blend`] and is clamped to `[0, 1]`.
#[must_use = "returns the combined image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn arithmetic(a: &Image, b: &Image, op: ArithmeticOp, weight: f64) -> Image {
    let weight = weight.clamp(0.0, 1.0);
    zip_colors(a, b, |x, y| match op {
        ArithmeticOp::Add => x.saturating_add(y),
        ArithmeticOp::Subtract => x.saturating_sub(y),
        ArithmeticOp::Multiply => {
            let product = u16::from(x) * u16::from(y);
            ((product + 127) / 255) as u8
        }
        ArithmeticOp::Difference => x.abs_diff(y),
        ArithmeticOp::Blend => {
            let mixed = f64::from(x).mul_add(1.0 - weight, f64::from(y) * weight);
            mixed.round().clamp(0.0, 255.0) as u8
        }
    })
}

/// Combine `a` and `b` bitwise with `op`.
#[must_use = "returns the combined image"]
pub fn logic(a: &Image, b: &Image, op: LogicOp) -> Image {
    zip_colors(a, b, |x, y| match op {
        LogicOp::And => x & y,
        LogicOp::Or => x | y,
        LogicOp::Xor => x ^ y,
    })
}

fn zip_colors(a: &Image, b: &Image, f: impl Fn(u8, u8) -> u8) -> Image {
    let mut out = a.clone();
    for (p, q) in out.pixels_mut().zip(b.pixels()) {
        for c in 0..3 {
            p.0[c] = f(p.0[c], q.0[c]);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn flat(v: u8, alpha: u8) -> Image {
        Image::from_pixel(2, 2, image::Rgba([v, v, v, alpha]))
    }

    #[test]
    fn add_saturates() {
        let out = arithmetic(&flat(200, 255), &flat(100, 0), ArithmeticOp::Add, 0.5);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn subtract_saturates() {
        let out = arithmetic(&flat(50, 10), &flat(100, 255), ArithmeticOp::Subtract, 0.5);
        assert_eq!(out.get_pixel(1, 1).0, [0, 0, 0, 10]);
    }

    #[test]
    fn multiply_normalizes() {
        let out = arithmetic(&flat(255, 255), &flat(128, 255), ArithmeticOp::Multiply, 0.5);
        assert_eq!(out.get_pixel(0, 0).0[0], 128);
        let out = arithmetic(&flat(100, 255), &flat(0, 255), ArithmeticOp::Multiply, 0.5);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn difference_is_symmetric() {
        let ab = arithmetic(&flat(30, 255), &flat(90, 255), ArithmeticOp::Difference, 0.5);
        let ba = arithmetic(&flat(90, 255), &flat(30, 255), ArithmeticOp::Difference, 0.5);
        assert_eq!(ab.get_pixel(0, 0).0[..3], [60, 60, 60]);
        assert_eq!(ab.get_pixel(0, 0).0[..3], ba.get_pixel(0, 0).0[..3]);
    }

    #[test]
    fn blend_weights() {
        let a = flat(0, 255);
        let b = flat(200, 255);
        assert_eq!(arithmetic(&a, &b, ArithmeticOp::Blend, 0.0), a);
        assert_eq!(arithmetic(&a, &b, ArithmeticOp::Blend, 0.5).get_pixel(0, 0).0[0], 100);
        assert_eq!(arithmetic(&a, &b, ArithmeticOp::Blend, 1.0).get_pixel(0, 0).0[0], 200);
    }

    #[test]
    fn logic_ops() {
        let a = flat(0b1100_1100, 255);
        let b = flat(0b1010_1010, 0);
        assert_eq!(logic(&a, &b, LogicOp::And).get_pixel(0, 0).0, [0b1000_1000, 0b1000_1000, 0b1000_1000, 255]);
        assert_eq!(logic(&a, &b, LogicOp::Or).get_pixel(0, 0).0[0], 0b1110_1110);
        assert_eq!(logic(&a, &b, LogicOp::Xor).get_pixel(0, 0).0[0], 0b0110_0110);
    }

    #[test]
    fn op_names_parse() {
        for name in ArithmeticOp::NAMES {
            assert_eq!(name.parse::<ArithmeticOp>().unwrap().to_string(), *name);
        }
        for name in LogicOp::NAMES {
            assert_eq!(name.parse::<LogicOp>().unwrap().to_string(), *name);
        }
        assert!("nand".parse::<LogicOp>().is_err());
    }
}
