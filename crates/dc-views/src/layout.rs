//! Canvas layout: grid flow and free-form drag/resize geometry

use dc_core::{LayoutSettings, Point, Position, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by layout configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Grid mode supports 1 to 4 columns, got {0}")]
    InvalidGridColumns(u8),
}

/// Number of columns in grid mode (1..=4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GridColumns(u8);

impl GridColumns {
    pub const MAX: u8 = 4;

    pub fn new(columns: u8) -> Result<Self, LayoutError> {
        if (1..=Self::MAX).contains(&columns) {
            Ok(Self(columns))
        } else {
            Err(LayoutError::InvalidGridColumns(columns))
        }
    }

    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl Default for GridColumns {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<u8> for GridColumns {
    type Error = LayoutError;

    fn try_from(columns: u8) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<GridColumns> for u8 {
    fn from(columns: GridColumns) -> u8 {
        columns.0
    }
}

/// How charts are arranged on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LayoutMode {
    /// Document-order flow; positions are implicit
    Grid { columns: GridColumns },
    /// Explicit pixel geometry per chart
    #[serde(rename = "freeform")]
    FreeForm,
}

impl LayoutMode {
    pub fn from_settings(settings: &LayoutSettings) -> Result<Self, LayoutError> {
        Ok(LayoutMode::Grid {
            columns: GridColumns::new(settings.grid_columns)?,
        })
    }

    pub fn is_free_form(&self) -> bool {
        matches!(self, LayoutMode::FreeForm)
    }
}

impl Default for LayoutMode {
    fn default() -> Self {
        LayoutMode::Grid {
            columns: GridColumns::default(),
        }
    }
}

/// Canvas position for the chart that follows `count` existing charts
pub fn next_grid_position(count: usize, columns: GridColumns, settings: &LayoutSettings) -> Position {
    let column = count % columns.get();
    let row = count / columns.get();
    Position::new(
        column as f32 * (settings.default_width + settings.gap),
        row as f32 * (settings.default_height + settings.gap),
    )
}

/// Placement of one chart in grid mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    /// Index of the chart in document order
    pub index: usize,
    pub row: usize,
    pub column: usize,
    pub position: Position,
    pub size: Size,
}

/// Flow charts into grid cells in document order.
///
/// Cells share the column width; each row is as tall as its tallest card.
/// Cells never overlap.
pub fn grid_cells(sizes: &[Size], columns: GridColumns, settings: &LayoutSettings) -> Vec<GridCell> {
    let width = settings.default_width;
    let mut cells = Vec::with_capacity(sizes.len());
    let mut y = 0.0;

    for (row, chunk) in sizes.chunks(columns.get()).enumerate() {
        let row_height = chunk
            .iter()
            .map(|s| s.height.max(settings.min_height))
            .fold(settings.min_height, f32::max);

        for (column, size) in chunk.iter().enumerate() {
            cells.push(GridCell {
                index: row * columns.get() + column,
                row,
                column,
                position: Position::new(column as f32 * (width + settings.gap), y),
                size: Size::new(width, size.height.max(settings.min_height)),
            });
        }
        y += row_height + settings.gap;
    }

    cells
}

/// A free-form drag in progress.
///
/// Keeps the grab point under the pointer; the result never leaves the
/// canvas origin quadrant but is otherwise unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGesture {
    grab_offset: Point,
}

impl DragGesture {
    /// Capture the pointer over a chart at `position`
    pub fn begin(pointer: Point, canvas_origin: Point, position: Position) -> Self {
        let local = pointer - canvas_origin;
        Self {
            grab_offset: Point::new(local.x - position.x, local.y - position.y),
        }
    }

    /// Position for the current pointer location
    pub fn update(&self, pointer: Point, canvas_origin: Point) -> Position {
        let local = pointer - canvas_origin;
        Position::new(local.x - self.grab_offset.x, local.y - self.grab_offset.y).clamped_to_origin()
    }
}

/// One of the eight resize handles of a chart card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::N,
        ResizeHandle::S,
        ResizeHandle::E,
        ResizeHandle::W,
        ResizeHandle::Ne,
        ResizeHandle::Nw,
        ResizeHandle::Se,
        ResizeHandle::Sw,
    ];

    fn moves_left(&self) -> bool {
        matches!(self, ResizeHandle::W | ResizeHandle::Nw | ResizeHandle::Sw)
    }

    fn moves_right(&self) -> bool {
        matches!(self, ResizeHandle::E | ResizeHandle::Ne | ResizeHandle::Se)
    }

    fn moves_top(&self) -> bool {
        matches!(self, ResizeHandle::N | ResizeHandle::Ne | ResizeHandle::Nw)
    }

    fn moves_bottom(&self) -> bool {
        matches!(self, ResizeHandle::S | ResizeHandle::Se | ResizeHandle::Sw)
    }
}

/// A resize in progress, measured from where the handle was grabbed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeGesture {
    handle: ResizeHandle,
    start_pointer: Point,
    start_position: Position,
    start_size: Size,
    min_size: Size,
}

impl ResizeGesture {
    pub fn begin(
        handle: ResizeHandle,
        pointer: Point,
        position: Position,
        size: Size,
        settings: &LayoutSettings,
    ) -> Self {
        Self {
            handle,
            start_pointer: pointer,
            start_position: position,
            start_size: size,
            min_size: Size::new(settings.min_width, settings.min_height),
        }
    }

    pub fn handle(&self) -> ResizeHandle {
        self.handle
    }

    /// Geometry for the current pointer location.
    ///
    /// Left and top handles keep the opposite edge fixed; once the minimum
    /// is reached the moving edge locks at `opposite edge - minimum`.
    pub fn update(&self, pointer: Point) -> (Position, Size) {
        let delta = pointer - self.start_pointer;
        let (x, width) = Self::axis(
            self.start_position.x,
            self.start_size.width,
            self.min_size.width,
            delta.x,
            self.handle.moves_left(),
            self.handle.moves_right(),
        );
        let (y, height) = Self::axis(
            self.start_position.y,
            self.start_size.height,
            self.min_size.height,
            delta.y,
            self.handle.moves_top(),
            self.handle.moves_bottom(),
        );
        (Position::new(x, y), Size::new(width, height))
    }

    fn axis(start: f32, length: f32, min: f32, delta: f32, leading: bool, trailing: bool) -> (f32, f32) {
        if trailing {
            return (start, (length + delta).max(min));
        }
        if !leading {
            return (start, length.max(min));
        }

        let far_edge = start + length;
        let length = (length - delta).max(min);
        let start = far_edge - length;
        if start < 0.0 {
            // Pinned at the canvas origin
            (0.0, far_edge.max(min))
        } else {
            (start, length)
        }
    }
}
