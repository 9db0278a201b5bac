//! gridglyph - GPU-accelerated terminal grid text renderer
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Editor backend (cells)                      │
//! ├──────────────────────────────────────────────┤
//! │  grid::group_cells     → styled runs         │
//! │  font::ligature        → ligature clusters   │
//! │     └─ shaping (GSUB/GDEF)                   │
//! │  font::atlas           → texture array tiles │
//! │  gpu::renderer         → instanced quads     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the render thread; nothing here is `Send`.

pub mod config;
pub mod constants;
pub mod error;
pub mod font;
pub mod gpu;
pub mod grid;
pub mod shaping;
pub mod utils;

pub use error::{AtlasError, RenderError, ShapingError};
