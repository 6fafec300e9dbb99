//! Composition controller for the dashboard composer
//!
//! Ties the source registry, filter engine, edit sessions, layout engine and
//! dashboard store together behind one owner of the chart list.

mod controller;
mod error;

pub use controller::{CompositionController, Placement};
pub use error::ComposeError;
