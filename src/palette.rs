// Colour palettes and the diverging colour map used by heatmaps

use crate::style::Palette;
use plotters::style::RGBColor;

const DEEP: [u32; 10] = [
    0x4C72B0, 0xDD8452, 0x55A868, 0xC44E52, 0x8172B3, 0x937860, 0xDA8BC3, 0x8C8C8C, 0xCCB974, 0x64B5CD,
];
const MUTED: [u32; 10] = [
    0x4878D0, 0xEE854A, 0x6ACC64, 0xD65F5F, 0x956CB4, 0x8C613C, 0xDC7EC0, 0x797979, 0xD5BB67, 0x82C6E2,
];
const BRIGHT: [u32; 10] = [
    0x023EFF, 0xFF7C00, 0x1AC938, 0xE8000B, 0x8B2BE2, 0x9F4800, 0xF14CC1, 0xA3A3A3, 0xFFC400, 0x00D7FF,
];
const PASTEL: [u32; 10] = [
    0xA1C9F4, 0xFFB482, 0x8DE5A1, 0xFF9F9B, 0xD0BBFF, 0xDEBB9B, 0xFAB0E4, 0xCFCFCF, 0xFFFEA3, 0xB9F2F0,
];
const DARK: [u32; 10] = [
    0x001C7F, 0xB1400D, 0x12711C, 0x8C0800, 0x591E71, 0x592F0D, 0xA23582, 0x3C3C3C, 0xB8850A, 0x006374,
];
const COLORBLIND: [u32; 10] = [
    0x0173B2, 0xDE8F05, 0x029E73, 0xD55E00, 0xCC78BC, 0xCA9161, 0xFBAFE4, 0x949494, 0xECE133, 0x56B4E9,
];
const SET2: [u32; 8] = [
    0x66C2A5, 0xFC8D62, 0x8DA0CB, 0xE78AC3, 0xA6D854, 0xFFD92F, 0xE5C494, 0xB3B3B3,
];

const HUSL_COLORS: usize = 6;

// blue -> near white -> red
const DIVERGING_LOW: u32 = 0x2369BD;
const DIVERGING_MID: u32 = 0xF0EEEE;
const DIVERGING_HIGH: u32 = 0xA9373B;

pub fn hex(rgb: u32) -> RGBColor {
    RGBColor((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// Ordered colour cycle for a named palette
#[derive(Debug, Clone)]
pub struct ColorCycle {
    colors: Vec<RGBColor>,
}

impl ColorCycle {
    pub fn new(palette: Palette) -> Self {
        let codes: &[u32] = match palette {
            Palette::Husl => return Self { colors: husl_cycle(HUSL_COLORS) },
            Palette::Deep => &DEEP,
            Palette::Muted => &MUTED,
            Palette::Bright => &BRIGHT,
            Palette::Pastel => &PASTEL,
            Palette::Dark => &DARK,
            Palette::Colorblind => &COLORBLIND,
            Palette::Set2 => &SET2,
        };
        Self {
            colors: codes.iter().map(|&c| hex(c)).collect(),
        }
    }

    /// Colour for the n-th series; wraps around
    pub fn color(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// `n` hues evenly spaced around the HSLuv circle, starting just past red
fn husl_cycle(n: usize) -> Vec<RGBColor> {
    (0..n)
        .map(|i| {
            let hue = ((i as f64 / n as f64 + 0.01) % 1.0) * 359.0;
            husl_to_rgb(hue, 0.9 * 99.0, 0.65 * 99.0)
        })
        .collect()
}

// HSLuv (hue 0-360, saturation and lightness 0-100) to sRGB, D65 white

const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.240969941904521, -1.537383177570093, -0.498610760293],
    [-0.96924363628087, 1.87596750150772, 0.041555057407175],
    [0.055630079696993, -0.20397695888897, 1.056971514242878],
];
const REF_U: f64 = 0.19783000664283;
const REF_V: f64 = 0.46831999493879;
const KAPPA: f64 = 903.2962962;
const EPSILON: f64 = 0.0088564516;

/// Sides of the sRGB gamut in the chroma plane at lightness `l`, as (slope, intercept)
fn gamut_bounds(l: f64) -> [(f64, f64); 6] {
    let sub1 = (l + 16.0).powi(3) / 1560896.0;
    let sub2 = if sub1 > EPSILON { sub1 } else { l / KAPPA };
    let mut bounds = [(0.0, 0.0); 6];
    for (c, [m1, m2, m3]) in XYZ_TO_RGB.iter().copied().enumerate() {
        for t in 0..2 {
            let t = t as f64;
            let top1 = (284517.0 * m1 - 94839.0 * m3) * sub2;
            let top2 = (838422.0 * m3 + 769860.0 * m2 + 731718.0 * m1) * l * sub2 - 769860.0 * t * l;
            let bottom = (632260.0 * m3 - 126452.0 * m2) * sub2 + 126452.0 * t;
            bounds[c * 2 + t as usize] = (top1 / bottom, top2 / bottom);
        }
    }
    bounds
}

fn max_chroma(l: f64, h: f64) -> f64 {
    let rad = h.to_radians();
    gamut_bounds(l)
        .iter()
        .map(|&(slope, intercept)| intercept / (rad.sin() - slope * rad.cos()))
        .filter(|len| *len >= 0.0)
        .fold(f64::INFINITY, f64::min)
}

fn to_srgb_channel(c: f64) -> u8 {
    let c = if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub fn husl_to_rgb(h: f64, s: f64, l: f64) -> RGBColor {
    if l > 99.9999999 {
        return RGBColor(255, 255, 255);
    }
    if l < 1e-8 {
        return RGBColor(0, 0, 0);
    }
    // LCh -> Luv
    let chroma = max_chroma(l, h) / 100.0 * s;
    let rad = h.to_radians();
    let (u, v) = (chroma * rad.cos(), chroma * rad.sin());

    // Luv -> XYZ
    let var_u = u / (13.0 * l) + REF_U;
    let var_v = v / (13.0 * l) + REF_V;
    let y = if l <= 8.0 { l / KAPPA } else { ((l + 16.0) / 116.0).powi(3) };
    let x = -(9.0 * y * var_u) / ((var_u - 4.0) * var_v - var_u * var_v);
    let z = (9.0 * y - 15.0 * var_v * y - var_v * x) / (3.0 * var_v);

    let [r, g, b] = XYZ_TO_RGB.map(|[m1, m2, m3]| to_srgb_channel(m1 * x + m2 * y + m3 * z));
    RGBColor(r, g, b)
}

fn lerp(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round().clamp(0.0, 255.0) as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Diverging colour map; `t` in [-1, 1], clamped
pub fn diverging(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(-1.0, 1.0) } else { 0.0 };
    if t < 0.0 {
        lerp(hex(DIVERGING_MID), hex(DIVERGING_LOW), -t)
    } else {
        lerp(hex(DIVERGING_MID), hex(DIVERGING_HIGH), t)
    }
}
