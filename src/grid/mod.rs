//! Grid model consumed by the renderer
//!
//! The editing backend owns the real buffer; this module only defines the
//! cell snapshot it hands over and the per-row grouping into styled runs.

pub mod cell;
pub mod cell_group;

pub use cell::{Cell, CellAttrs, CellStyle, Color};
pub use cell_group::{group_cells, CellGroup};

/// Per-row access to the backend's visible cells
pub trait CellSource {
    fn columns(&self) -> usize;
    fn rows(&self) -> usize;
    fn cell(&self, column: usize, row: usize) -> &Cell;
}

/// Owned cell grid (diagnostics and tests)
#[derive(Debug, Clone)]
pub struct CellGrid {
    columns: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl CellGrid {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![Cell::empty(); columns * rows],
        }
    }

    /// Build a grid from lines of text, one cell per `char`
    pub fn from_lines(lines: &[&str]) -> Self {
        let columns = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let mut grid = Self::new(columns, lines.len());
        for (row, line) in lines.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let mut buf = [0u8; 4];
                grid.set(col, row, Cell::new(ch.encode_utf8(&mut buf)));
            }
        }
        grid
    }

    pub fn set(&mut self, column: usize, row: usize, cell: Cell) {
        if column < self.columns && row < self.rows {
            self.cells[row * self.columns + column] = cell;
        }
    }
}

impl CellSource for CellGrid {
    fn columns(&self) -> usize {
        self.columns
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cell(&self, column: usize, row: usize) -> &Cell {
        &self.cells[row * self.columns + column]
    }
}
