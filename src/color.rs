use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct `#rrggbb` colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            format!(
                "#{:02x}{:02x}{:02x}",
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: series position → colour
// ---------------------------------------------------------------------------

/// Maps series positions to distinct colours. Series are told apart by
/// position, so two series sharing a label still get different colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    palette: Vec<String>,
    default_color: String,
}

impl ColorMap {
    /// Build a colour map for `series` series.
    pub fn new(series: usize) -> Self {
        ColorMap {
            palette: generate_palette(series),
            default_color: "#808080".to_string(),
        }
    }

    pub fn color_at(&self, index: usize) -> &str {
        self.palette
            .get(index)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Plot style carried by each population
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    #[default]
    Circle,
    Square,
    Triangle,
    Star,
    Cross,
}

/// Default plotting keywords of a population; derived populations inherit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotStyle {
    /// `None` lets the summary pick a palette colour.
    pub color: Option<String>,
    pub marker: Marker,
    pub size: f64,
    pub alpha: f64,
    pub zorder: i32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            color: None,
            marker: Marker::Circle,
            size: 4.0,
            alpha: 0.8,
            zorder: 0,
        }
    }
}

impl PlotStyle {
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_zorder(mut self, zorder: i32) -> Self {
        self.zorder = zorder;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_colours_are_distinct() {
        let palette = generate_palette(5);
        assert_eq!(palette.len(), 5);
        for (i, a) in palette.iter().enumerate() {
            assert!(a.starts_with('#') && a.len() == 7);
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_color_map_falls_back_to_grey() {
        let map = ColorMap::new(2);
        assert_ne!(map.color_at(0), map.color_at(1));
        assert_eq!(map.color_at(2), "#808080");
    }
}
