//! Cell model
//!
//! Read-only snapshot of what the editing backend shows in one grid cell.

use bitflags::bitflags;
use smol_str::SmolStr;

/// Cell color as delivered by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Theme default (foreground or background depending on use)
    #[default]
    Default,
    /// 256-color palette index
    Indexed(u8),
    /// True Color (24bit RGB)
    Rgb(u8, u8, u8),
}

impl Color {
    /// Convert to RGBA float array (for shaders)
    ///
    /// `default` is the theme color substituted for [`Color::Default`].
    pub fn to_rgba(&self, default: [f32; 4]) -> [f32; 4] {
        match self {
            Color::Default => default,
            Color::Indexed(idx) => PALETTE_256[*idx as usize],
            Color::Rgb(r, g, b) => [*r as f32 / 255.0, *g as f32 / 255.0, *b as f32 / 255.0, 1.0],
        }
    }
}

/// Pre-computed 256-color palette as RGBA (compile-time generated)
const fn generate_palette() -> [[f32; 4]; 256] {
    let mut palette = [[0.0f32; 4]; 256];

    const fn rgb(r: u8, g: u8, b: u8) -> [f32; 4] {
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
    }

    const fn cube_val(v: u8) -> u8 {
        if v == 0 { 0 } else { 55 + 40 * v }
    }

    const ANSI: [(u8, u8, u8); 16] = [
        (0, 0, 0),
        (205, 0, 0),
        (0, 205, 0),
        (205, 205, 0),
        (0, 0, 238),
        (205, 0, 205),
        (0, 205, 205),
        (229, 229, 229),
        (127, 127, 127),
        (255, 0, 0),
        (0, 255, 0),
        (255, 255, 0),
        (92, 92, 255),
        (255, 0, 255),
        (0, 255, 255),
        (255, 255, 255),
    ];

    let mut i = 0usize;
    while i < 16 {
        let (r, g, b) = ANSI[i];
        palette[i] = rgb(r, g, b);
        i += 1;
    }

    // 216-color cube (16-231)
    while i < 232 {
        let n = (i - 16) as u8;
        palette[i] = rgb(cube_val(n / 36), cube_val((n / 6) % 6), cube_val(n % 6));
        i += 1;
    }

    // Grayscale ramp (232-255)
    while i < 256 {
        let v = (8 + 10 * (i - 232)) as u8;
        palette[i] = rgb(v, v, v);
        i += 1;
    }

    palette
}

static PALETTE_256: [[f32; 4]; 256] = generate_palette();

bitflags! {
    /// Cell character attributes the renderer cares about
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellAttrs: u8 {
        const BOLD      = 0b0001;
        const ITALIC    = 0b0010;
        const UNDERLINE = 0b0100;
    }
}

/// Data for one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Single grapheme, or empty for an unwritten cell
    pub grapheme: SmolStr,
    pub fg: Color,
    pub bg: Color,
    pub attrs: CellAttrs,
}

/// Style tuple compared when merging cells into groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Cell {
    /// Create empty cell
    pub fn empty() -> Cell {
        Cell {
            grapheme: SmolStr::default(),
            fg: Color::Default,
            bg: Color::Default,
            attrs: CellAttrs::empty(),
        }
    }

    /// Cell holding `grapheme` with default colors
    pub fn new(grapheme: &str) -> Cell {
        Cell {
            grapheme: SmolStr::new(grapheme),
            ..Cell::empty()
        }
    }

    pub fn with_colors(mut self, fg: Color, bg: Color) -> Cell {
        self.fg = fg;
        self.bg = bg;
        self
    }

    pub fn with_attrs(mut self, attrs: CellAttrs) -> Cell {
        self.attrs = attrs;
        self
    }

    /// Empty or space cells carry no glyph
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.grapheme.is_empty() || self.grapheme == " "
    }

    #[inline]
    pub fn bold(&self) -> bool {
        self.attrs.contains(CellAttrs::BOLD)
    }

    #[inline]
    pub fn italic(&self) -> bool {
        self.attrs.contains(CellAttrs::ITALIC)
    }

    #[inline]
    pub fn underline(&self) -> bool {
        self.attrs.contains(CellAttrs::UNDERLINE)
    }

    pub fn style(&self) -> CellStyle {
        CellStyle {
            fg: self.fg,
            bg: self.bg,
            bold: self.bold(),
            italic: self.italic(),
            underline: self.underline(),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_cells() {
        assert!(Cell::empty().is_blank());
        assert!(Cell::new(" ").is_blank());
        assert!(!Cell::new("a").is_blank());
    }

    #[test]
    fn test_palette_lookup() {
        let white = [1.0, 1.0, 1.0, 1.0];
        assert_eq!(Color::Default.to_rgba(white), white);
        assert_eq!(Color::Indexed(15).to_rgba([0.0; 4]), white);
        // 232 is the darkest grayscale step (8/255)
        let gray = Color::Indexed(232).to_rgba([0.0; 4]);
        assert!((gray[0] - 8.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_style_reflects_attrs() {
        let cell = Cell::new("x").with_attrs(CellAttrs::BOLD | CellAttrs::UNDERLINE);
        let style = cell.style();
        assert!(style.bold);
        assert!(!style.italic);
        assert!(style.underline);
    }
}
