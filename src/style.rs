use crate::error::{LabError, LabResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 600;

/// Named colour cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Palette {
    #[default]
    #[serde(rename = "deep")]
    Deep,
    #[serde(rename = "muted")]
    Muted,
    #[serde(rename = "bright")]
    Bright,
    #[serde(rename = "pastel")]
    Pastel,
    #[serde(rename = "dark")]
    Dark,
    #[serde(rename = "colorblind")]
    Colorblind,
    #[serde(rename = "Set2")]
    Set2,
    /// Evenly spaced hues at equal perceived lightness
    #[serde(rename = "husl")]
    Husl,
}

impl Palette {
    pub const ALL: [Palette; 8] = [
        Palette::Deep,
        Palette::Muted,
        Palette::Bright,
        Palette::Pastel,
        Palette::Dark,
        Palette::Colorblind,
        Palette::Set2,
        Palette::Husl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Palette::Deep => "deep",
            Palette::Muted => "muted",
            Palette::Bright => "bright",
            Palette::Pastel => "pastel",
            Palette::Dark => "dark",
            Palette::Colorblind => "colorblind",
            Palette::Set2 => "Set2",
            Palette::Husl => "husl",
        }
    }
}

/// Scaling preset for fonts and line widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    Paper,
    #[default]
    Notebook,
    Talk,
    Poster,
}

impl Context {
    pub const ALL: [Context; 4] = [Context::Paper, Context::Notebook, Context::Talk, Context::Poster];

    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Paper => "paper",
            Context::Notebook => "notebook",
            Context::Talk => "talk",
            Context::Poster => "poster",
        }
    }

    pub fn scale(&self) -> f64 {
        match self {
            Context::Paper => 0.8,
            Context::Notebook => 1.0,
            Context::Talk => 1.5,
            Context::Poster => 2.0,
        }
    }
}

/// Panel background and grid preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridStyle {
    #[default]
    Whitegrid,
    Darkgrid,
    White,
    Dark,
    Ticks,
}

impl GridStyle {
    pub const ALL: [GridStyle; 5] = [
        GridStyle::Whitegrid,
        GridStyle::Darkgrid,
        GridStyle::White,
        GridStyle::Dark,
        GridStyle::Ticks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GridStyle::Whitegrid => "whitegrid",
            GridStyle::Darkgrid => "darkgrid",
            GridStyle::White => "white",
            GridStyle::Dark => "dark",
            GridStyle::Ticks => "ticks",
        }
    }

    pub fn has_grid(&self) -> bool {
        matches!(self, GridStyle::Whitegrid | GridStyle::Darkgrid)
    }

    pub fn shaded_panel(&self) -> bool {
        matches!(self, GridStyle::Darkgrid | GridStyle::Dark)
    }
}

macro_rules! impl_named {
    ($ty:ty, $field:literal) => {
        impl FromStr for $ty {
            type Err = LabError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        let names: Vec<&str> = <$ty>::ALL.iter().map(|v| v.as_str()).collect();
                        LabError::config($field, format!("unknown value '{}' (expected one of: {})", s, names.join(", ")))
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_named!(Palette, "palette");
impl_named!(Context, "context");
impl_named!(GridStyle, "grid");

/// Styling applied uniformly to every chart; never affects which rows are drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleOptions {
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub grid: GridStyle,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

pub(crate) fn default_dpi() -> u32 {
    300
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            context: Context::default(),
            grid: GridStyle::default(),
            dark_mode: false,
            dpi: default_dpi(),
        }
    }
}

impl StyleOptions {
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn validate(&self) -> LabResult<()> {
        validate_dpi(self.dpi)
    }
}

pub fn validate_dpi(dpi: u32) -> LabResult<()> {
    if !(MIN_DPI..=MAX_DPI).contains(&dpi) {
        return Err(LabError::config(
            "dpi",
            format!("{} is outside the supported range {}..={}", dpi, MIN_DPI, MAX_DPI),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("deep".parse::<Palette>().unwrap(), Palette::Deep);
        assert_eq!("set2".parse::<Palette>().unwrap(), Palette::Set2);
        assert_eq!("Poster".parse::<Context>().unwrap(), Context::Poster);
        assert_eq!("ticks".parse::<GridStyle>().unwrap(), GridStyle::Ticks);
        assert_eq!("husl".parse::<Palette>().unwrap(), Palette::Husl);
        assert!("viridis".parse::<Palette>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for p in Palette::ALL {
            assert_eq!(p.to_string().parse::<Palette>().unwrap(), p);
        }
        for c in Context::ALL {
            assert_eq!(c.to_string().parse::<Context>().unwrap(), c);
        }
    }

    #[test]
    fn test_dpi_range() {
        assert!(StyleOptions::default().validate().is_ok());
        assert!(StyleOptions::default().with_dpi(72).validate().is_ok());
        assert!(StyleOptions::default().with_dpi(600).validate().is_ok());
        assert!(StyleOptions::default().with_dpi(71).validate().is_err());
        assert!(StyleOptions::default().with_dpi(601).validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let style: StyleOptions = serde_json::from_str(r#"{"palette": "Set2", "dark_mode": true}"#).unwrap();
        assert_eq!(style.palette, Palette::Set2);
        assert_eq!(style.context, Context::Notebook);
        assert!(style.dark_mode);
        assert_eq!(style.dpi, 300);
    }
}
