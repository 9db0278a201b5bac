//! gridglyph - diagnostic front end
//!
//! Runs the shaping and atlas stages on the CPU so font setups can be
//! checked without a GPU or a window.

use anyhow::{anyhow, Result};
use log::{info, warn};
use smol_str::SmolStr;
use unicode_normalization::char::is_combining_mark;

use gridglyph::config::{self, Config};
use gridglyph::font::{
    cell_spans, create_ligature_grouper, AtlasSettings, FontFace, FontdueRasterizer, GlyphAtlas, LigatureGrouper,
    NoopLigatureGrouper, StyledFonts,
};
use gridglyph::RenderError;

/// Print help message
fn print_help() {
    println!(
        r#"gridglyph {} - GPU terminal grid text renderer (diagnostics)

USAGE:
    gridglyph [OPTIONS] <COMMAND> [TEXT]

COMMANDS:
    shape <text>    Print the ligature clusters of <text>
    atlas <text>    Rasterize each cluster and print its atlas placement
    config          Print the effective configuration as TOML

OPTIONS:
    -h, --help      Print this help message
    -V, --version   Print version information

ENVIRONMENT:
    GRIDGLYPH_CONFIG   Config file path
    RUST_LOG           Log filter (default: warn)

CONFIG FILE:
    ~/.config/gridglyph/config.toml
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// One cell per character; combining marks stay with their base
fn cells_of(text: &str) -> Vec<SmolStr> {
    let mut cells: Vec<String> = Vec::new();
    for c in text.chars() {
        match cells.last_mut() {
            Some(last) if is_combining_mark(c) => last.push(c),
            _ => cells.push(c.to_string()),
        }
    }
    cells.into_iter().map(SmolStr::from).collect()
}

fn grouper_for(config: &Config) -> Box<dyn LigatureGrouper> {
    if config.font.ligatures {
        create_ligature_grouper(&config.font.family)
    } else {
        Box::new(NoopLigatureGrouper)
    }
}

/// `shape <text>`
fn shape_mode(config: &Config, text: &str) -> Result<()> {
    let cells = cells_of(text);
    let mut grouper = grouper_for(config);
    let clusters = grouper.ligature_groups(&cells);
    let spans = cell_spans(&cells, &clusters);

    println!("font: {}", config.font.family);
    println!("cells: {}", cells.len());
    for (cluster, span) in clusters.iter().zip(spans) {
        let marker = if span > 1 { "  (ligature)" } else { "" };
        println!("  {:?} x{}{}", cluster.as_str(), span, marker);
    }
    Ok(())
}

/// `atlas <text>`
fn atlas_mode(config: &Config, text: &str) -> Result<()> {
    let settings = AtlasSettings::from_config(&config.atlas);
    let fonts = StyledFonts::load(&config.font)?;
    let mut rasterizer = FontdueRasterizer::new(
        fonts,
        config.font.clamped_size(),
        settings.device_pixel_ratio,
        settings.texture_size,
    )?;
    if config.font.ligatures {
        match FontFace::load(&config.font.family) {
            Ok(face) => rasterizer = rasterizer.with_shaping(face.tables),
            Err(e) => warn!("Ligature glyphs unavailable: {:#}", e),
        }
    }

    let mut atlas = GlyphAtlas::new(rasterizer, settings);
    let (cell_width, cell_height) = atlas.cell_size();
    println!("cell: {:.2}x{:.2}", cell_width, cell_height);

    let cells = cells_of(text);
    let clusters = grouper_for(config).ligature_groups(&cells);
    for cluster in &clusters {
        let glyph = atlas.get_glyph(cluster, false, false, 0).map_err(RenderError::from)?;
        println!(
            "  {:?}: layer {} uv ({:.4}, {:.4}) size {:.4}x{:.4} quad {}x{}",
            cluster.as_str(),
            glyph.texture_layer,
            glyph.texture_u,
            glyph.texture_v,
            glyph.texture_width,
            glyph.texture_height,
            glyph.width,
            glyph.height
        );
    }

    let stats = atlas.stats();
    println!("layers used: {}, rows: {}, glyphs: {}", stats.layer + 1, stats.rows, stats.glyphs);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Check command line arguments
    let args: Vec<String> = std::env::args().skip(1).collect();

    // --help
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("gridglyph {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load();
    if let Some(path) = Config::config_path().or_else(config::default_config_path) {
        info!("Config path: {}", path.display());
    }

    let text = args[1..].join(" ");
    match args[0].as_str() {
        "shape" if !text.is_empty() => shape_mode(&config, &text),
        "atlas" if !text.is_empty() => atlas_mode(&config, &text),
        "config" => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        "shape" | "atlas" => Err(anyhow!("{} needs some text, e.g. `gridglyph {} \"a -> b\"`", args[0], args[0])),
        other => Err(anyhow!("Unknown command: {} (see --help)", other)),
    }
}
