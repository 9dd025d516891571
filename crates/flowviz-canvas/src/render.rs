//! Graph renderer - draws the laid-out flow graph to an egui painter
//!
//! Draw order: segment backgrounds and labels, edges, nodes (with nested
//! service rows and warn/error badges), selection highlight.

use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2};

use flowviz::graph::{FlowEdge, FlowGraph, FlowNode, NodeKind, ServiceNode};

use crate::camera::Camera2D;
use crate::colors;

/// Vertical offset of the nested service area inside a composite card;
/// together with the nested layout margin this clears the header text
const SERVICE_OFFSET_Y: f32 = 44.0;
/// Horizontal inset of the nested service area
const SERVICE_OFFSET_X: f32 = 8.0;

/// World-space rect of a laid-out node
pub fn node_world_rect(node: &FlowNode) -> Option<Rect> {
    let (x, y, w, h) = node.rect()?;
    Some(Rect::from_min_size(Pos2::new(x, y), Vec2::new(w, h)))
}

/// World-space rect of a nested service row
pub fn service_world_rect(node: &FlowNode, svc: &ServiceNode) -> Option<Rect> {
    let (nx, ny, _, _) = node.rect()?;
    let (lx, ly) = (svc.x?, svc.y?);
    Some(Rect::from_min_size(
        Pos2::new(nx + SERVICE_OFFSET_X + lx, ny + SERVICE_OFFSET_Y + ly),
        Vec2::new(svc.width, svc.height),
    ))
}

/// Stateless painter for flow graphs
#[derive(Default)]
pub struct GraphRenderer;

impl GraphRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render the whole graph
    pub fn render(
        &self,
        painter: &Painter,
        graph: &FlowGraph,
        camera: &Camera2D,
        screen_rect: Rect,
        hovered: Option<&str>,
    ) {
        self.draw_segments(painter, graph, camera, screen_rect);
        self.draw_edges(painter, graph, camera, screen_rect);
        for node in &graph.nodes {
            self.draw_node(painter, node, camera, screen_rect, hovered);
        }
    }

    // =========================================================================
    // SEGMENTS
    // =========================================================================

    fn draw_segments(
        &self,
        painter: &Painter,
        graph: &FlowGraph,
        camera: &Camera2D,
        screen_rect: Rect,
    ) {
        for segment in &graph.segments {
            let Some(bounds) = graph.segment_bounds.get(&segment.name) else {
                continue;
            };
            let world = Rect::from_min_max(
                Pos2::new(bounds.min_x, bounds.min_y),
                Pos2::new(bounds.max_x, bounds.max_y),
            );
            let rect = camera.world_rect_to_screen(world, screen_rect);
            painter.rect_filled(
                rect,
                16.0 * camera.zoom,
                colors::segment_fill(&segment.name),
            );
            painter.rect_stroke(
                rect,
                16.0 * camera.zoom,
                Stroke::new(1.0, colors::segment_stroke(&segment.name)),
            );

            let (lx, ly) = bounds.label_anchor();
            let label_pos = camera.world_to_screen(Pos2::new(lx, ly), screen_rect);
            painter.text(
                label_pos,
                Align2::LEFT_CENTER,
                format!("Segment: {}", segment.name),
                FontId::proportional((14.0 * camera.zoom).clamp(9.0, 18.0)),
                colors::segment_label(&segment.name),
            );
        }
    }

    // =========================================================================
    // EDGES
    // =========================================================================

    fn draw_edges(
        &self,
        painter: &Painter,
        graph: &FlowGraph,
        camera: &Camera2D,
        screen_rect: Rect,
    ) {
        for edge in &graph.edges {
            let (Some(src), Some(dst)) = (graph.get_node(&edge.source), graph.get_node(&edge.target))
            else {
                continue;
            };
            let (Some(src_rect), Some(dst_rect)) = (node_world_rect(src), node_world_rect(dst))
            else {
                continue;
            };
            self.draw_arrow(painter, edge, src_rect, dst_rect, camera, screen_rect);
        }
    }

    /// Straight arrow between the facing sides of two node rects
    fn draw_arrow(
        &self,
        painter: &Painter,
        edge: &FlowEdge,
        src: Rect,
        dst: Rect,
        camera: &Camera2D,
        screen_rect: Rect,
    ) {
        let delta = dst.center() - src.center();
        let (start, end) = if delta.x.abs() >= delta.y.abs() {
            if delta.x >= 0.0 {
                (src.right_center(), dst.left_center())
            } else {
                (src.left_center(), dst.right_center())
            }
        } else if delta.y >= 0.0 {
            (src.center_bottom(), dst.center_top())
        } else {
            (src.center_top(), dst.center_bottom())
        };

        let start = camera.world_to_screen(start, screen_rect);
        let end = camera.world_to_screen(end, screen_rect);
        let color = colors::emphasis_color(edge.emphasis);
        let stroke = Stroke::new((2.0 * camera.zoom).max(1.0), color);
        painter.line_segment([start, end], stroke);

        // Arrowhead
        let dir = (end - start).normalized();
        let size = (8.0 * camera.zoom).max(4.0);
        let left = end - dir * size + dir.rot90() * (size * 0.5);
        let right = end - dir * size - dir.rot90() * (size * 0.5);
        painter.add(egui::Shape::convex_polygon(
            vec![end, left, right],
            color,
            Stroke::NONE,
        ));
    }

    // =========================================================================
    // NODES
    // =========================================================================

    fn draw_node(
        &self,
        painter: &Painter,
        node: &FlowNode,
        camera: &Camera2D,
        screen_rect: Rect,
        hovered: Option<&str>,
    ) {
        let Some(world) = node_world_rect(node) else {
            return;
        };
        let rect = camera.world_rect_to_screen(world, screen_rect);
        let accent = colors::kind_color(&node.type_tag);
        let is_hovered = hovered == Some(node.id.as_str());

        // Selection halo behind the card
        if node.selected {
            let halo =
                Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), 50);
            painter.rect_filled(rect.expand(4.0 * camera.zoom), 14.0 * camera.zoom, halo);
        }

        let fill = if node.selected {
            colors::NODE_FILL_SELECTED
        } else {
            colors::NODE_FILL
        };
        painter.rect_filled(rect, 12.0 * camera.zoom, fill);
        let border_width = if is_hovered { 3.0 } else { 2.0 };
        painter.rect_stroke(
            rect,
            12.0 * camera.zoom,
            Stroke::new(border_width * camera.zoom.max(0.5), accent),
        );

        // Header: name and type tag
        let pad = 12.0 * camera.zoom;
        painter.text(
            rect.left_top() + Vec2::new(pad, pad),
            Align2::LEFT_TOP,
            &node.label,
            FontId::proportional((15.0 * camera.zoom).clamp(8.0, 20.0)),
            accent,
        );
        if camera.zoom > 0.3 {
            painter.text(
                rect.left_top() + Vec2::new(pad, pad + 18.0 * camera.zoom),
                Align2::LEFT_TOP,
                &node.type_tag,
                FontId::proportional((12.0 * camera.zoom).clamp(7.0, 16.0)),
                colors::TEXT_MUTED,
            );
        }

        self.draw_badges(painter, node.warn, node.error, rect, camera);

        if node.kind == NodeKind::Composite {
            self.draw_services(painter, node, camera, screen_rect, hovered);
        }
    }

    /// Warn/error count badges in the top-right corner
    fn draw_badges(
        &self,
        painter: &Painter,
        warn: u32,
        error: u32,
        rect: Rect,
        camera: &Camera2D,
    ) {
        if camera.zoom <= 0.3 {
            return;
        }
        let font = FontId::proportional((11.0 * camera.zoom).clamp(7.0, 14.0));
        let mut anchor = rect.right_top() + Vec2::new(-6.0 * camera.zoom, 6.0 * camera.zoom);

        for (count, label, color) in [
            (error, "err", colors::ERROR_BADGE),
            (warn, "warn", colors::WARN_BADGE),
        ] {
            if count == 0 {
                continue;
            }
            let text = format!("{}: {}", label, count);
            let galley = painter.layout_no_wrap(text, font.clone(), Color32::WHITE);
            let size = galley.size() + Vec2::splat(6.0 * camera.zoom);
            let badge = Rect::from_min_size(anchor - Vec2::new(size.x, 0.0), size);
            painter.rect_filled(badge, 6.0 * camera.zoom, color);
            painter.galley(
                badge.min + Vec2::splat(3.0 * camera.zoom),
                galley,
                Color32::WHITE,
            );
            anchor.x -= size.x + 4.0 * camera.zoom;
        }
    }

    // =========================================================================
    // NESTED SERVICES
    // =========================================================================

    fn draw_services(
        &self,
        painter: &Painter,
        node: &FlowNode,
        camera: &Camera2D,
        screen_rect: Rect,
        hovered: Option<&str>,
    ) {
        let accent = colors::kind_color(&node.type_tag);

        // Nested edges first, under the rows
        for edge in &node.service_edges {
            let src = node.services.iter().find(|s| s.id == edge.source);
            let dst = node.services.iter().find(|s| s.id == edge.target);
            let (Some(src), Some(dst)) = (src, dst) else {
                continue;
            };
            let (Some(src_rect), Some(dst_rect)) = (
                service_world_rect(node, src),
                service_world_rect(node, dst),
            ) else {
                continue;
            };
            self.draw_arrow(painter, edge, src_rect, dst_rect, camera, screen_rect);
        }

        for svc in &node.services {
            let Some(world) = service_world_rect(node, svc) else {
                continue;
            };
            let rect = camera.world_rect_to_screen(world, screen_rect);
            let fill = if svc.selected {
                colors::SERVICE_FILL_SELECTED
            } else {
                colors::NODE_FILL
            };
            painter.rect_filled(rect, 6.0 * camera.zoom, fill);
            let border = if hovered == Some(svc.id.as_str()) {
                2.0
            } else {
                1.0
            };
            painter.rect_stroke(
                rect,
                6.0 * camera.zoom,
                Stroke::new(border * camera.zoom.max(0.5), accent),
            );

            let pad = 6.0 * camera.zoom;
            painter.text(
                rect.left_top() + Vec2::new(pad, pad),
                Align2::LEFT_TOP,
                &svc.label,
                FontId::proportional((12.0 * camera.zoom).clamp(7.0, 15.0)),
                accent,
            );
            if let Some(sub) = &svc.sub_type {
                if camera.zoom > 0.4 {
                    painter.text(
                        rect.left_top() + Vec2::new(pad, pad + 14.0 * camera.zoom),
                        Align2::LEFT_TOP,
                        sub,
                        FontId::proportional((10.0 * camera.zoom).clamp(6.0, 13.0)),
                        colors::TEXT_MUTED,
                    );
                }
            }

            self.draw_badges(painter, svc.warn, svc.error, rect, camera);
        }
    }
}
