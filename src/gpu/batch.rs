//! Frame batching
//!
//! Turns the visible grid into instance lists for the quad shaders. Nothing
//! here touches GL, so the whole layout path is testable on the CPU.

use crate::config::RenderConfig;
use crate::constants::{UNDERLINE_POSITION_SCALE, UNDERLINE_THICKNESS_SCALE};
use crate::error::AtlasError;
use crate::font::atlas::GlyphAtlas;
use crate::font::ligature::{cell_spans, LigatureGrouper};
use crate::font::rasterizer::GlyphRasterizer;
use crate::grid::{group_cells, CellGroup, CellSource, Color};

/// Per-instance data: rect(4) + color(4) = 8 floats
pub const SOLID_INSTANCE_FLOATS: usize = 8;
/// Per-instance data: rect(4) + tex_rect(4) + layer(1) + color(4) = 13 floats
pub const GLYPH_INSTANCE_FLOATS: usize = 13;

/// Flat-colored quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidInstance {
    /// x, y, width, height (pixels)
    pub rect: [f32; 4],
    pub color: [f32; 4],
}

/// Textured glyph quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInstance {
    /// x, y, width, height (pixels)
    pub rect: [f32; 4],
    /// u, v, width, height (normalized)
    pub tex_rect: [f32; 4],
    pub layer: f32,
    pub color: [f32; 4],
}

/// Theme colors substituted for [`Color::Default`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTheme {
    pub background: [f32; 4],
    pub foreground: [f32; 4],
    pub cursor: [f32; 4],
}

impl FrameTheme {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            background: config.background_rgba(),
            foreground: config.foreground_rgba(),
            cursor: config.cursor_rgba(),
        }
    }
}

impl Default for FrameTheme {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

/// Cell geometry in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub width: f32,
    pub height: f32,
    /// Top of cell to baseline
    pub ascent: f32,
}

/// Instances of one frame, in draw order: backgrounds, glyphs, overlays
#[derive(Debug, Clone)]
pub struct FrameBatch {
    metrics: CellMetrics,
    pub backgrounds: Vec<SolidInstance>,
    pub glyphs: Vec<GlyphInstance>,
    pub overlays: Vec<SolidInstance>,
}

impl FrameBatch {
    pub fn new(metrics: CellMetrics) -> Self {
        Self {
            metrics,
            backgrounds: Vec::new(),
            glyphs: Vec::new(),
            overlays: Vec::new(),
        }
    }

    pub fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    /// New cell geometry (font size change); takes effect on the next build
    pub fn set_metrics(&mut self, metrics: CellMetrics) {
        self.metrics = metrics;
    }

    pub fn clear(&mut self) {
        self.backgrounds.clear();
        self.glyphs.clear();
        self.overlays.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.backgrounds.is_empty() && self.glyphs.is_empty() && self.overlays.is_empty()
    }

    fn cells_rect(&self, column: usize, row: usize, span: usize) -> [f32; 4] {
        [
            column as f32 * self.metrics.width,
            row as f32 * self.metrics.height,
            span as f32 * self.metrics.width,
            self.metrics.height,
        ]
    }

    /// Rebuild every instance list for the visible grid
    pub fn build_frame<S, R>(
        &mut self,
        source: &S,
        grouper: &mut dyn LigatureGrouper,
        atlas: &mut GlyphAtlas<R>,
        theme: &FrameTheme,
        cursor: Option<(usize, usize)>,
    ) -> Result<(), AtlasError>
    where
        S: CellSource + ?Sized,
        R: GlyphRasterizer,
    {
        self.clear();
        for row in 0..source.rows() {
            self.push_row_backgrounds(source, row, theme);
            let groups = group_cells(source.columns(), row, |column, row| source.cell(column, row));
            for group in &groups {
                self.push_group(row, group, grouper, atlas, theme)?;
            }
        }
        if let Some((column, row)) = cursor {
            self.push_cursor(column, row, theme.cursor);
        }
        Ok(())
    }

    /// Non-default cell backgrounds, merged into runs of equal color.
    ///
    /// Blank cells count too; default backgrounds come from the clear color.
    pub fn push_row_backgrounds<S: CellSource + ?Sized>(&mut self, source: &S, row: usize, theme: &FrameTheme) {
        let mut run: Option<(usize, usize, Color)> = None;
        for column in 0..=source.columns() {
            let bg = if column < source.columns() {
                source.cell(column, row).bg
            } else {
                Color::Default
            };
            if let Some((start, len, color)) = run {
                if color == bg {
                    run = Some((start, len + 1, color));
                    continue;
                }
                self.backgrounds.push(SolidInstance {
                    rect: self.cells_rect(start, row, len),
                    color: color.to_rgba(theme.background),
                });
                run = None;
            }
            if bg != Color::Default {
                run = Some((column, 1, bg));
            }
        }
    }

    /// Glyph quads for one cell group, one per ligature cluster
    pub fn push_group<R: GlyphRasterizer>(
        &mut self,
        row: usize,
        group: &CellGroup,
        grouper: &mut dyn LigatureGrouper,
        atlas: &mut GlyphAtlas<R>,
        theme: &FrameTheme,
    ) -> Result<(), AtlasError> {
        let clusters = grouper.ligature_groups(&group.characters);
        let spans = cell_spans(&group.characters, &clusters);
        let color = group.fg.to_rgba(theme.foreground);
        let variants = atlas.settings().variant_count.max(1);
        let top = row as f32 * self.metrics.height;

        let mut column = group.start_column;
        for (cluster, span) in clusters.iter().zip(spans) {
            let x = column as f32 * self.metrics.width;
            let frac = x - x.floor();
            let variant = ((frac * variants as f32) as u32).min(variants - 1);
            let glyph = atlas.get_glyph(cluster, group.bold, group.italic, variant)?;

            let pad = glyph.padding as f32;
            self.glyphs.push(GlyphInstance {
                rect: [x.floor() - pad, top - pad, glyph.width as f32, glyph.height as f32],
                tex_rect: [
                    glyph.texture_u,
                    glyph.texture_v,
                    glyph.texture_width,
                    glyph.texture_height,
                ],
                layer: glyph.texture_layer as f32,
                color,
            });
            column += span;
        }

        if group.underline {
            let CellMetrics { width, height, ascent } = self.metrics;
            let thickness = (height * UNDERLINE_THICKNESS_SCALE).max(1.0);
            let y = top + ascent + (height - ascent) * UNDERLINE_POSITION_SCALE;
            self.overlays.push(SolidInstance {
                rect: [
                    group.start_column as f32 * width,
                    y.round(),
                    group.characters.len() as f32 * width,
                    thickness.round(),
                ],
                color,
            });
        }
        Ok(())
    }

    /// Block cursor, drawn under the text
    pub fn push_cursor(&mut self, column: usize, row: usize, color: [f32; 4]) {
        self.backgrounds.push(SolidInstance {
            rect: self.cells_rect(column, row, 1),
            color,
        });
    }
}

/// View instance data as bytes for buffer upload
pub(crate) fn as_bytes<T: Copy>(slice: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, std::mem::size_of_val(slice)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::atlas::AtlasSettings;
    use crate::font::ligature::{NoopLigatureGrouper, ShapingLigatureGrouper};
    use crate::font::test_support::FakeRasterizer;
    use crate::grid::{Cell, CellAttrs, CellGrid};
    use crate::shaping::test_support::{arrow_calt_gsub, char_to_gid, sfnt};
    use crate::shaping::ShapingTables;

    const METRICS: CellMetrics = CellMetrics {
        width: 8.0,
        height: 16.0,
        ascent: 12.0,
    };

    fn atlas(texture_size: u32, layer_count: u32, padding: u32) -> GlyphAtlas<FakeRasterizer> {
        GlyphAtlas::new(
            FakeRasterizer::new(texture_size),
            AtlasSettings {
                texture_size,
                layer_count,
                variant_count: 3,
                padding,
                device_pixel_ratio: 1.0,
            },
        )
    }

    fn arrow_grouper() -> ShapingLigatureGrouper<fn(char) -> u16> {
        let font = sfnt(&[(b"GSUB", arrow_calt_gsub().to_bytes())]);
        let tables = ShapingTables::parse(&font, 0).unwrap();
        ShapingLigatureGrouper::new(char_to_gid as fn(char) -> u16, tables).unwrap()
    }

    fn xs(batch: &FrameBatch) -> Vec<f32> {
        batch.glyphs.iter().map(|g| g.rect[0]).collect()
    }

    #[test]
    fn test_one_quad_per_cell_without_ligatures() {
        let grid = CellGrid::from_lines(&["a ->"]);
        let mut atlas = atlas(256, 1, 2);
        let mut batch = FrameBatch::new(METRICS);
        batch
            .build_frame(&grid, &mut NoopLigatureGrouper, &mut atlas, &FrameTheme::default(), None)
            .unwrap();

        assert_eq!(xs(&batch), vec![-2.0, 14.0, 22.0]);
        assert_eq!(batch.glyphs[0].rect[1], -2.0);
        assert_eq!(batch.glyphs[0].rect[2..], [12.0, 20.0]);
        assert!(batch.backgrounds.is_empty());
        assert!(batch.overlays.is_empty());
    }

    #[test]
    fn test_ligature_cluster_spans_its_cells() {
        let grid = CellGrid::from_lines(&["", "a->a"]);
        let mut atlas = atlas(256, 1, 0);
        let mut grouper = arrow_grouper();
        let mut batch = FrameBatch::new(METRICS);
        batch
            .build_frame(&grid, &mut grouper, &mut atlas, &FrameTheme::default(), None)
            .unwrap();

        assert_eq!(xs(&batch), vec![0.0, 8.0, 24.0]);
        assert_eq!(batch.glyphs[1].rect[2], 16.0);
        assert!(batch.glyphs.iter().all(|g| g.rect[1] == 16.0));
        // the two "a" quads share one atlas entry
        assert_eq!(atlas.stats().glyphs, 2);
    }

    #[test]
    fn test_backgrounds_cursor_and_underline() {
        let mut grid = CellGrid::new(4, 1);
        let red = Color::Rgb(255, 0, 0);
        grid.set(0, 0, Cell::new("x").with_colors(Color::Default, red));
        grid.set(1, 0, Cell::empty().with_colors(Color::Default, red));
        grid.set(
            2,
            0,
            Cell::new("y")
                .with_colors(Color::Indexed(2), Color::Default)
                .with_attrs(CellAttrs::UNDERLINE),
        );
        let theme = FrameTheme::default();
        let mut atlas = atlas(256, 1, 0);
        let mut batch = FrameBatch::new(METRICS);
        batch
            .build_frame(&grid, &mut NoopLigatureGrouper, &mut atlas, &theme, Some((3, 0)))
            .unwrap();

        assert_eq!(
            batch.backgrounds,
            vec![
                SolidInstance {
                    rect: [0.0, 0.0, 16.0, 16.0],
                    color: [1.0, 0.0, 0.0, 1.0],
                },
                SolidInstance {
                    rect: [24.0, 0.0, 8.0, 16.0],
                    color: theme.cursor,
                },
            ]
        );
        assert_eq!(batch.overlays.len(), 1);
        let underline = batch.overlays[0];
        assert_eq!(underline.rect[0], 16.0);
        assert_eq!(underline.rect[2], 8.0);
        assert!(underline.rect[1] >= 12.0 && underline.rect[1] < 16.0);
        assert_eq!(underline.color, Color::Indexed(2).to_rgba(theme.foreground));
        assert_eq!(batch.glyphs[0].color, theme.foreground);
    }

    #[test]
    fn test_fractional_columns_pick_variants() {
        let grid = CellGrid::from_lines(&["ab"]);
        let mut atlas = atlas(256, 1, 0);
        let mut batch = FrameBatch::new(CellMetrics {
            width: 7.5,
            ..METRICS
        });
        batch
            .build_frame(&grid, &mut NoopLigatureGrouper, &mut atlas, &FrameTheme::default(), None)
            .unwrap();

        assert_eq!(xs(&batch), vec![0.0, 7.0]);
        let draws = atlas.rasterizer().draws.len();
        // x = 7.5 lands in the middle third
        atlas.get_glyph("b", false, false, 1).unwrap();
        assert_eq!(atlas.rasterizer().draws.len(), draws);
    }

    #[test]
    fn test_atlas_exhaustion_propagates() {
        let grid = CellGrid::from_lines(&["abc"]);
        // room for exactly two 8x16 glyphs
        let mut atlas = atlas(16, 1, 0);
        let mut batch = FrameBatch::new(METRICS);
        let err = batch
            .build_frame(&grid, &mut NoopLigatureGrouper, &mut atlas, &FrameTheme::default(), None)
            .unwrap_err();
        assert_eq!(
            err,
            AtlasError::TextureSpaceExhausted {
                layers: 1,
                texture_size: 16
            }
        );
    }

    #[test]
    fn test_instance_layout_matches_attribute_strides() {
        assert_eq!(std::mem::size_of::<SolidInstance>(), SOLID_INSTANCE_FLOATS * 4);
        assert_eq!(std::mem::size_of::<GlyphInstance>(), GLYPH_INSTANCE_FLOATS * 4);
        let solids = [SolidInstance {
            rect: [0.0; 4],
            color: [1.0; 4],
        }; 3];
        assert_eq!(as_bytes(&solids).len(), 3 * SOLID_INSTANCE_FLOATS * 4);
    }
}
