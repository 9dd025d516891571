//! Input handling - pan, zoom, hover and selection
//!
//! Actions are returned as state changes polled by the app each frame;
//! no callbacks.

use egui::{CursorIcon, Rect, Response};

use flowviz::graph::FlowGraph;

use crate::camera::Camera2D;
use crate::render::{node_world_rect, service_world_rect};

/// A selection change requested by the user: `Some(id)` selects a node or
/// nested service, `None` clears the selection
pub type SelectionUpdate = Option<String>;

/// Hover and pending-selection state
#[derive(Debug, Default)]
pub struct InputState {
    pub hovered: Option<String>,
    pending: Option<SelectionUpdate>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the pending selection change, if any
    pub fn take_selection_change(&mut self) -> Option<SelectionUpdate> {
        self.pending.take()
    }
}

/// Handle one frame of input. Returns true if a repaint is needed.
pub fn handle_input(
    response: &Response,
    camera: &mut Camera2D,
    state: &mut InputState,
    graph: &FlowGraph,
    screen_rect: Rect,
) -> bool {
    let mut needs_repaint = false;

    // Drag pans the camera
    if response.dragged() {
        camera.pan_screen(response.drag_delta());
        needs_repaint = true;
    }

    // Scroll zooms around the cursor
    if response.hovered() {
        let scroll = response.ctx.input(|i| i.smooth_scroll_delta.y);
        if scroll.abs() > 0.1 {
            if let Some(pos) = response.hover_pos() {
                let factor = (scroll * 0.003).exp();
                camera.zoom_at(pos, screen_rect, factor);
                needs_repaint = true;
            }
        }
    }

    // Hover hit test: nested service rows win over their container,
    // later nodes are drawn on top and win over earlier ones
    state.hovered = None;
    if let Some(pos) = response.hover_pos() {
        let world = camera.screen_to_world(pos, screen_rect);
        for node in graph.nodes.iter().rev() {
            let Some(rect) = node_world_rect(node) else {
                continue;
            };
            if !rect.contains(world) {
                continue;
            }
            let mut hit = node.id.clone();
            for svc in &node.services {
                if let Some(svc_rect) = service_world_rect(node, svc) {
                    if svc_rect.contains(world) {
                        hit = svc.id.clone();
                        break;
                    }
                }
            }
            state.hovered = Some(hit);
            break;
        }
    }

    // Click selects the hovered item; Escape clears the selection
    if response.clicked() {
        if let Some(id) = state.hovered.clone() {
            state.pending = Some(Some(id));
            needs_repaint = true;
        }
    }
    if response.ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        state.pending = Some(None);
        needs_repaint = true;
    }

    needs_repaint
}

/// Cursor shape for the current input state
pub fn cursor_for_state(state: &InputState, dragging: bool) -> CursorIcon {
    if dragging {
        CursorIcon::Grabbing
    } else if state.hovered.is_some() {
        CursorIcon::PointingHand
    } else {
        CursorIcon::Default
    }
}
