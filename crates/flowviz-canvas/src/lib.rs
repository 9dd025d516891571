//! flowviz canvas widget
//!
//! This crate contains the interactive graph canvas: a camera with
//! pan/zoom, hit testing and selection dispatch, and the painter that
//! draws segment backgrounds, emphasis-colored edges and element nodes.
//! The viewer binary wires the polling loader and the canvas into a
//! small native app.

pub mod api;
pub mod camera;
pub mod colors;
pub mod input;
pub mod render;
pub mod widget;

pub use camera::Camera2D;
pub use input::{InputState, SelectionUpdate};
pub use render::GraphRenderer;
pub use widget::FlowCanvas;
