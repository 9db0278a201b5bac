//! Cell grouping
//!
//! Scans one grid row and merges adjacent, same-styled, non-blank cells
//! into runs. Runs are the unit handed to ligature grouping, so a run
//! never crosses a blank cell or a style change.

use std::borrow::Borrow;

use smol_str::SmolStr;

use super::cell::{Cell, CellStyle, Color};

/// Contiguous run of same-styled, non-blank cells within one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGroup {
    /// Column of the first character
    pub start_column: usize,
    /// One entry per cell, in column order
    pub characters: Vec<SmolStr>,
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl CellGroup {
    fn start(column: usize, cell: &Cell) -> Self {
        let style = cell.style();
        Self {
            start_column: column,
            characters: vec![cell.grapheme.clone()],
            fg: style.fg,
            bg: style.bg,
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
        }
    }

    /// Column just past the last character
    #[inline]
    pub fn end_column(&self) -> usize {
        self.start_column + self.characters.len()
    }

    pub fn style(&self) -> CellStyle {
        CellStyle {
            fg: self.fg,
            bg: self.bg,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
        }
    }

    /// Concatenated characters (ligature cache key)
    pub fn text(&self) -> String {
        self.characters.iter().map(SmolStr::as_str).collect()
    }
}

/// Group one row into cell runs
///
/// `get_cell(column, row)` may return the cell by value or by reference.
/// Blank cells terminate the current group; a style change or a column gap
/// starts a new one.
pub fn group_cells<F, C>(column_count: usize, row_index: usize, mut get_cell: F) -> Vec<CellGroup>
where
    F: FnMut(usize, usize) -> C,
    C: Borrow<Cell>,
{
    let mut groups: Vec<CellGroup> = Vec::new();

    for column in 0..column_count {
        let cell = get_cell(column, row_index);
        let cell = cell.borrow();

        if cell.is_blank() {
            continue;
        }

        match groups.last_mut() {
            Some(last) if last.end_column() == column && last.style() == cell.style() => {
                last.characters.push(cell.grapheme.clone());
            }
            _ => groups.push(CellGroup::start(column, cell)),
        }
    }

    groups
}
