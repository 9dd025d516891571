//! Camera2D - pan/zoom with smooth target interpolation
//!
//! Provides world-to-screen and screen-to-world coordinate transforms.
//! Camera state is UI-only; call `update(dt)` at the start of each frame,
//! then use the transforms for rendering.

use egui::{Pos2, Rect, Vec2};

/// How quickly the camera approaches its target per second
const FOLLOW_RATE: f32 = 8.0;

/// 2D camera with pan and zoom
#[derive(Debug, Clone)]
pub struct Camera2D {
    /// Center of the view in world coordinates
    pub center: Pos2,
    /// Zoom level - 1.0 = 100%
    pub zoom: f32,
    pub target_center: Pos2,
    pub target_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            center: Pos2::ZERO,
            zoom: 1.0,
            target_center: Pos2::ZERO,
            target_zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 1.5,
        }
    }
}

impl Camera2D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the interpolation toward the target
    pub fn update(&mut self, dt: f32) {
        let t = 1.0 - (-FOLLOW_RATE * dt).exp();
        self.center = self.center + (self.target_center - self.center) * t;
        self.zoom += (self.target_zoom - self.zoom) * t;
    }

    /// Jump to the target without animating
    pub fn snap_to_target(&mut self) {
        self.center = self.target_center;
        self.zoom = self.target_zoom;
    }

    pub fn is_animating(&self) -> bool {
        (self.center - self.target_center).length() > 0.1
            || (self.zoom - self.target_zoom).abs() > 0.001
    }

    // =========================================================================
    // TRANSFORMS
    // =========================================================================

    pub fn world_to_screen(&self, world: Pos2, screen_rect: Rect) -> Pos2 {
        screen_rect.center() + (world - self.center) * self.zoom
    }

    pub fn screen_to_world(&self, screen: Pos2, screen_rect: Rect) -> Pos2 {
        self.center + (screen - screen_rect.center()) / self.zoom
    }

    pub fn world_rect_to_screen(&self, world: Rect, screen_rect: Rect) -> Rect {
        Rect::from_min_max(
            self.world_to_screen(world.min, screen_rect),
            self.world_to_screen(world.max, screen_rect),
        )
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Pan by a screen-space delta (drag)
    pub fn pan_screen(&mut self, delta: Vec2) {
        let world_delta = delta / self.zoom;
        self.center -= world_delta;
        self.target_center = self.center;
    }

    /// Animate the camera to center on a world position
    pub fn pan_to(&mut self, world: Pos2) {
        self.target_center = world;
    }

    /// Zoom by a factor, keeping the world point under the cursor fixed
    pub fn zoom_at(&mut self, screen_pos: Pos2, screen_rect: Rect, factor: f32) {
        let anchor = self.screen_to_world(screen_pos, screen_rect);
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        self.zoom = new_zoom;
        self.target_zoom = new_zoom;
        // Re-solve the center so the anchor stays under the cursor
        self.center = anchor - (screen_pos - screen_rect.center()) / new_zoom;
        self.target_center = self.center;
    }

    /// Fit a world rect into the screen with padding on all sides
    pub fn fit_to_bounds(&mut self, bounds: Rect, screen_rect: Rect, padding: f32) {
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return;
        }
        let avail_w = (screen_rect.width() - 2.0 * padding).max(1.0);
        let avail_h = (screen_rect.height() - 2.0 * padding).max(1.0);
        let zoom = (avail_w / bounds.width())
            .min(avail_h / bounds.height())
            .clamp(self.min_zoom, self.max_zoom);
        self.target_zoom = zoom;
        self.target_center = bounds.center();
    }

    pub fn reset(&mut self) {
        self.target_center = Pos2::ZERO;
        self.target_zoom = 1.0;
    }
}

// =============================================================================
// TESTS
// =============================================================================
