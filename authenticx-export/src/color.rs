//! OKLCH / OKLab to sRGB conversion for widget capture.
//!
//! Dashboard styles are authored in OKLCH, which the capture rasterizer does
//! not understand. Computed style values are rewritten to `rgb()`/`rgba()`
//! before capture. Strings that are not a recognised color are passed
//! through untouched; that is a result, not an error.

use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

const NUM: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

static OKLCH_PATTERN: LazyLock<String> = LazyLock::new(|| {
    format!(
        r"(?i)oklch\(\s*({NUM}%?)\s+({NUM}%?)\s+({NUM})(?:deg)?\s*(?:/\s*({NUM}%?)\s*)?\)"
    )
});

static OKLAB_PATTERN: LazyLock<String> = LazyLock::new(|| {
    format!(r"(?i)oklab\(\s*({NUM}%?)\s+({NUM}%?)\s+({NUM}%?)\s*(?:/\s*({NUM}%?)\s*)?\)")
});

static OKLCH_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*{}\s*$", *OKLCH_PATTERN)).expect("valid oklch pattern")
});
static OKLAB_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*{}\s*$", *OKLAB_PATTERN)).expect("valid oklab pattern")
});
static PERCEPTUAL_ANY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("{}|{}", *OKLCH_PATTERN, *OKLAB_PATTERN))
        .expect("valid perceptual color pattern")
});

/// An sRGB color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha in `[0, 1]`.
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self::opaque(rgb[0], rgb[1], rgb[2])
    }

    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

/// Outcome of converting a color string.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorConversion {
    /// The input was a perceptual color and has an sRGB equivalent.
    Converted(Rgba),
    /// The input did not match; returned unchanged.
    Passthrough(String),
}

impl ColorConversion {
    pub fn is_converted(&self) -> bool {
        matches!(self, ColorConversion::Converted(_))
    }

    /// The CSS text to use after conversion.
    pub fn into_css(self) -> String {
        match self {
            ColorConversion::Converted(rgba) => rgba.to_string(),
            ColorConversion::Passthrough(s) => s,
        }
    }
}

/// Convert a single `oklch(...)` or `oklab(...)` color string to sRGB.
pub fn convert(input: &str) -> ColorConversion {
    if let Some(caps) = OKLCH_EXACT.captures(input) {
        if let Some(rgba) = oklch_captures(&caps, 1) {
            return ColorConversion::Converted(rgba);
        }
    } else if let Some(caps) = OKLAB_EXACT.captures(input) {
        if let Some(rgba) = oklab_captures(&caps, 1) {
            return ColorConversion::Converted(rgba);
        }
    }
    ColorConversion::Passthrough(input.to_string())
}

/// Replace every perceptual color occurring inside a style value.
///
/// Returns the rewritten value and the number of replacements. Used for
/// compound values such as gradients and shadows.
pub fn rewrite_colors(value: &str) -> (String, usize) {
    let mut replaced = 0usize;
    let out = PERCEPTUAL_ANY.replace_all(value, |caps: &Captures<'_>| {
        let converted = if caps.get(1).is_some() {
            oklch_captures(caps, 1)
        } else {
            oklab_captures(caps, 5)
        };
        match converted {
            Some(rgba) => {
                replaced += 1;
                rgba.to_string()
            }
            None => caps[0].to_string(),
        }
    });
    (out.into_owned(), replaced)
}

/// Whether a style value contains a perceptual color function.
pub fn has_perceptual_color(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.contains("oklch(") || lower.contains("oklab(")
}

/// OKLCH components to sRGB.
pub fn oklch_to_rgba(l: f32, c: f32, hue_deg: f32, alpha: f32) -> Rgba {
    let h = hue_deg.to_radians();
    oklab_to_rgba(l, c * h.cos(), c * h.sin(), alpha)
}

/// OKLab components to sRGB. Linear channels are clamped before encoding.
pub fn oklab_to_rgba(l: f32, a: f32, b: f32, alpha: f32) -> Rgba {
    let l_ = l + 0.396_337_78 * a + 0.215_803_76 * b;
    let m_ = l - 0.105_561_35 * a - 0.063_854_17 * b;
    let s_ = l - 0.089_484_18 * a - 1.291_485_5 * b;

    let lc = l_ * l_ * l_;
    let mc = m_ * m_ * m_;
    let sc = s_ * s_ * s_;

    let r = 4.076_741_7 * lc - 3.307_711_6 * mc + 0.230_969_94 * sc;
    let g = -1.268_438 * lc + 2.609_757_4 * mc - 0.341_319_4 * sc;
    let bl = -0.004_196_086_3 * lc - 0.703_418_6 * mc + 1.707_614_7 * sc;

    Rgba {
        r: encode_channel(r),
        g: encode_channel(g),
        b: encode_channel(bl),
        a: alpha.clamp(0.0, 1.0),
    }
}

/// sRGB transfer function on a clamped linear channel, scaled to 0-255.
fn encode_channel(linear: f32) -> u8 {
    let x = if linear.is_nan() { 0.0 } else { linear.clamp(0.0, 1.0) };
    let encoded = if x <= 0.003_130_8 {
        12.92 * x
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

fn oklch_captures(caps: &Captures<'_>, first: usize) -> Option<Rgba> {
    let l = parse_component(caps.get(first)?.as_str(), 1.0)?;
    // 100% chroma corresponds to 0.4
    let c = parse_component(caps.get(first + 1)?.as_str(), 0.4)?.max(0.0);
    let h = parse_component(caps.get(first + 2)?.as_str(), 1.0)?;
    let alpha = parse_alpha(caps.get(first + 3).map(|m| m.as_str()))?;
    Some(oklch_to_rgba(l, c, h, alpha))
}

fn oklab_captures(caps: &Captures<'_>, first: usize) -> Option<Rgba> {
    let l = parse_component(caps.get(first)?.as_str(), 1.0)?;
    let a = parse_component(caps.get(first + 1)?.as_str(), 0.4)?;
    let b = parse_component(caps.get(first + 2)?.as_str(), 0.4)?;
    let alpha = parse_alpha(caps.get(first + 3).map(|m| m.as_str()))?;
    Some(oklab_to_rgba(l, a, b, alpha))
}

/// Parse a number, mapping `N%` onto `N / 100 * percent_ref`.
fn parse_component(raw: &str, percent_ref: f32) -> Option<f32> {
    let value = match raw.strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok()? / 100.0 * percent_ref,
        None => raw.parse::<f32>().ok()?,
    };
    value.is_finite().then_some(value)
}

fn parse_alpha(raw: Option<&str>) -> Option<f32> {
    match raw {
        None => Some(1.0),
        Some(s) => parse_component(s, 1.0).map(|a| a.clamp(0.0, 1.0)),
    }
}
