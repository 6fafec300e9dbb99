//! Canvas layout, render contract and export for the dashboard composer

pub mod export;
pub mod layout;
pub mod render;

pub use export::DashboardExport;
pub use layout::{
    grid_cells, next_grid_position, DragGesture, GridCell, GridColumns, LayoutError, LayoutMode,
    ResizeGesture, ResizeHandle,
};
pub use render::{render, HeatCell, Visual};
