//! Flow canvas widget
//!
//! Owns the camera and input state, renders the current laid-out graph
//! and surfaces selection changes to the embedding app. The graph itself
//! is replaced wholesale whenever the app re-runs the pipeline.

use egui::{Color32, FontId, Rect, Sense, Vec2};

use flowviz::graph::FlowGraph;

use crate::camera::Camera2D;
use crate::input::{self, InputState, SelectionUpdate};
use crate::render::GraphRenderer;

/// Interactive canvas for one flow graph
pub struct FlowCanvas {
    camera: Camera2D,
    input_state: InputState,
    renderer: GraphRenderer,
    graph: Option<FlowGraph>,
    needs_initial_fit: bool,
}

impl Default for FlowCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowCanvas {
    pub fn new() -> Self {
        Self {
            camera: Camera2D::new(),
            input_state: InputState::new(),
            renderer: GraphRenderer::new(),
            graph: None,
            needs_initial_fit: true,
        }
    }

    /// Replace the rendered graph. Passing a graph for a different flow
    /// re-fits the camera; updates of the same flow keep the viewport.
    pub fn set_graph(&mut self, graph: FlowGraph) {
        let same_flow = self
            .graph
            .as_ref()
            .map(|g| g.stand == graph.stand && g.flow == graph.flow)
            .unwrap_or(false);
        if !same_flow {
            self.needs_initial_fit = true;
        }
        self.graph = Some(graph);
    }

    pub fn clear(&mut self) {
        self.graph = None;
        self.needs_initial_fit = true;
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    /// Consume the user's pending selection change
    pub fn take_selection_change(&mut self) -> Option<SelectionUpdate> {
        self.input_state.take_selection_change()
    }

    /// Fit the camera to the whole diagram
    pub fn fit_to_content(&mut self, screen_rect: Rect) {
        if let Some(bounds) = self.graph.as_ref().and_then(|g| g.content_bounds()) {
            let world = Rect::from_min_max(
                egui::pos2(bounds.min_x, bounds.min_y),
                egui::pos2(bounds.max_x, bounds.max_y),
            );
            self.camera.fit_to_bounds(world, screen_rect, 50.0);
        }
    }

    /// Main UI function
    pub fn ui(&mut self, ui: &mut egui::Ui) {
        let Some(graph) = &self.graph else {
            self.render_empty_state(ui);
            return;
        };

        let available = ui.available_size();
        let (response, painter) = ui.allocate_painter(available, Sense::click_and_drag());
        let screen_rect = response.rect;

        if self.needs_initial_fit {
            if let Some(bounds) = graph.content_bounds() {
                let world = Rect::from_min_max(
                    egui::pos2(bounds.min_x, bounds.min_y),
                    egui::pos2(bounds.max_x, bounds.max_y),
                );
                self.camera.fit_to_bounds(world, screen_rect, 50.0);
                self.camera.snap_to_target();
            }
            self.needs_initial_fit = false;
        }

        let dt = ui.input(|i| i.stable_dt);
        self.camera.update(dt);

        let needs_repaint = input::handle_input(
            &response,
            &mut self.camera,
            &mut self.input_state,
            graph,
            screen_rect,
        );

        ui.ctx().set_cursor_icon(input::cursor_for_state(
            &self.input_state,
            response.dragged(),
        ));

        // R refits the camera
        if response.ctx.input(|i| i.key_pressed(egui::Key::R)) {
            self.fit_to_content(screen_rect);
        }

        let graph = self.graph.as_ref().expect("graph checked above");
        self.renderer.render(
            &painter,
            graph,
            &self.camera,
            screen_rect,
            self.input_state.hovered.as_deref(),
        );
        self.render_chrome(&painter, graph, screen_rect);

        if needs_repaint || self.camera.is_animating() {
            ui.ctx().request_repaint();
        }
    }

    fn render_empty_state(&self, ui: &mut egui::Ui) {
        ui.centered_and_justified(|ui| {
            ui.label("No integrations loaded");
        });
    }

    /// Stats, zoom level and keyboard hints
    fn render_chrome(&self, painter: &egui::Painter, graph: &FlowGraph, screen_rect: Rect) {
        let stats_text = format!(
            "{} | {} elements | {} edges",
            graph.name,
            graph.stats.total_nodes,
            graph.stats.total_edges
        );
        painter.text(
            screen_rect.left_top() + Vec2::new(10.0, 20.0),
            egui::Align2::LEFT_TOP,
            stats_text,
            FontId::proportional(12.0),
            Color32::from_rgb(150, 150, 150),
        );

        let zoom_text = format!("Zoom: {:.0}%", self.camera.zoom * 100.0);
        painter.text(
            screen_rect.left_bottom() + Vec2::new(10.0, -28.0),
            egui::Align2::LEFT_BOTTOM,
            zoom_text,
            FontId::proportional(11.0),
            Color32::from_rgb(120, 120, 120),
        );

        let hints = "Drag: Pan | Scroll: Zoom | Click: Select | Esc: Clear | R: Fit";
        painter.text(
            screen_rect.left_bottom() + Vec2::new(10.0, -10.0),
            egui::Align2::LEFT_BOTTOM,
            hints,
            FontId::proportional(10.0),
            Color32::from_rgb(100, 100, 100),
        );
    }
}
