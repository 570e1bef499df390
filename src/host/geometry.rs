use glam::Vec2;

use crate::config::PipelineConfig;
use crate::effects::PointerRange;
use crate::protocol::{PointerPosition, SurfaceSize};

/// Container bounds in CSS pixels, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ContainerRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Physical surface size for a container: the CSS size scaled by the
/// capped pixel ratio, then uniformly shrunk until the longest edge fits
/// `max_dimension`.
pub fn surface_size(rect: ContainerRect, pixel_ratio: f32, config: &PipelineConfig) -> SurfaceSize {
    let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio.min(config.max_pixel_ratio)
    } else {
        1.0
    };
    let mut width = rect.width.max(0.0) * ratio;
    let mut height = rect.height.max(0.0) * ratio;
    let longest = width.max(height);
    let limit = config.max_dimension as f32;
    if longest > limit {
        let scale = limit / longest;
        width *= scale;
        height *= scale;
    }
    SurfaceSize::from_physical(width, height)
}

/// Maps a viewport-space pointer into the effect's range. Screen y grows
/// downward; the result grows upward. Values outside the container are
/// not clamped.
pub fn normalize_pointer(client: Vec2, rect: ContainerRect, range: PointerRange) -> PointerPosition {
    let width = if rect.width > 0.0 { rect.width } else { 1.0 };
    let height = if rect.height > 0.0 { rect.height } else { 1.0 };
    let unit = Vec2::new(
        (client.x - rect.left) / width,
        1.0 - (client.y - rect.top) / height,
    );
    match range {
        PointerRange::Unit => unit.into(),
        PointerRange::Signed => (unit * 2.0 - Vec2::ONE).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        let config = PipelineConfig::default();
        let rect = ContainerRect::new(0.0, 0.0, 300.5, 150.0);
        assert_eq!(surface_size(rect, 1.0, &config), SurfaceSize::new(300, 150));
        assert_eq!(surface_size(rect, 3.0, &config), SurfaceSize::new(601, 300));
        assert_eq!(surface_size(rect, f32::NAN, &config), SurfaceSize::new(300, 150));
    }

    #[test]
    fn longest_edge_is_bounded() {
        let config = PipelineConfig {
            max_dimension: 1000,
            ..PipelineConfig::default()
        };
        let rect = ContainerRect::new(0.0, 0.0, 4000.0, 1000.0);
        assert_eq!(surface_size(rect, 2.0, &config), SurfaceSize::new(1000, 250));
    }

    #[test]
    fn collapsed_containers_never_yield_zero() {
        let config = PipelineConfig::default();
        let rect = ContainerRect::new(10.0, 10.0, 0.0, 0.4);
        assert_eq!(surface_size(rect, 2.0, &config), SurfaceSize::new(1, 1));
    }

    #[test]
    fn pointer_flips_y_once() {
        let rect = ContainerRect::new(100.0, 50.0, 200.0, 100.0);
        let top_left = normalize_pointer(Vec2::new(100.0, 50.0), rect, PointerRange::Unit);
        assert_eq!(top_left, PointerPosition { x: 0.0, y: 1.0 });
        let bottom_right = normalize_pointer(Vec2::new(300.0, 150.0), rect, PointerRange::Unit);
        assert_eq!(bottom_right, PointerPosition { x: 1.0, y: 0.0 });
        let center = normalize_pointer(Vec2::new(200.0, 100.0), rect, PointerRange::Signed);
        assert_eq!(center, PointerPosition { x: 0.0, y: 0.0 });
        let top = normalize_pointer(Vec2::new(200.0, 50.0), rect, PointerRange::Signed);
        assert_eq!(top, PointerPosition { x: 0.0, y: 1.0 });
    }

    #[test]
    fn pointer_outside_is_not_clamped() {
        let rect = ContainerRect::new(0.0, 0.0, 100.0, 100.0);
        let outside = normalize_pointer(Vec2::new(150.0, -50.0), rect, PointerRange::Unit);
        assert_eq!(outside, PointerPosition { x: 1.5, y: 1.5 });
    }
}
