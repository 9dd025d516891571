//! Color palette for nodes, edges and segment backgrounds

use egui::Color32;

use flowviz::graph::Emphasis;

/// Border/accent color per element type tag
pub fn kind_color(type_tag: &str) -> Color32 {
    match type_tag.to_lowercase().as_str() {
        "kafka" => Color32::from_rgb(76, 175, 80),
        "k8s" => Color32::from_rgb(33, 150, 243),
        "nginx" => Color32::from_rgb(255, 152, 0),
        "geo-load-balancer" => Color32::from_rgb(156, 39, 176),
        _ => Color32::from_rgb(96, 125, 139),
    }
}

fn segment_base(name: &str) -> Color32 {
    match name.to_lowercase().as_str() {
        "delta" => Color32::from_rgb(76, 175, 80),
        "omega" => Color32::from_rgb(255, 152, 0),
        "alpha" => Color32::from_rgb(33, 150, 243),
        _ => Color32::from_rgb(96, 125, 139),
    }
}

/// Background tint of a segment box
pub fn segment_fill(name: &str) -> Color32 {
    let base = segment_base(name);
    Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), 26)
}

/// Border of a segment box
pub fn segment_stroke(name: &str) -> Color32 {
    let base = segment_base(name);
    Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), 77)
}

/// Segment label text color
pub fn segment_label(name: &str) -> Color32 {
    let base = segment_base(name);
    Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), 204)
}

/// Edge color by derived emphasis level
pub fn emphasis_color(emphasis: Emphasis) -> Color32 {
    match emphasis {
        Emphasis::Normal => Color32::from_rgb(33, 150, 243),
        Emphasis::Warn => Color32::from_rgb(255, 152, 0),
        Emphasis::Error => Color32::from_rgb(211, 47, 47),
    }
}

/// Badge background for warn counts
pub const WARN_BADGE: Color32 = Color32::from_rgb(255, 152, 0);
/// Badge background for error counts
pub const ERROR_BADGE: Color32 = Color32::from_rgb(211, 47, 47);

/// Node card backgrounds
pub const NODE_FILL: Color32 = Color32::WHITE;
pub const NODE_FILL_SELECTED: Color32 = Color32::from_rgb(248, 249, 250);
pub const SERVICE_FILL_SELECTED: Color32 = Color32::from_rgb(227, 242, 253);
/// Secondary label text
pub const TEXT_MUTED: Color32 = Color32::from_rgb(120, 120, 120);
