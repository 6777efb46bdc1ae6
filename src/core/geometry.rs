use glam::Vec2;

/// Share of the screen a freshly created window may cover
pub const SCREEN_FRACTION: f32 = 0.75;

/// Where a scaled image lands inside a window, in physical pixels (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

/// Scale `image` to fit `margin` of `area` keeping its aspect ratio, centered
pub fn fit_centered(image: (u32, u32), area: (u32, u32), margin: f32) -> Placement {
    let image = Vec2::new(image.0.max(1) as f32, image.1.max(1) as f32);
    let area = Vec2::new(area.0 as f32, area.1 as f32);

    let scale = (margin * area / image).min_element();
    let size = image * scale;
    let origin = (area - size) * 0.5;

    Placement {
        x: origin.x,
        y: origin.y,
        width: size.x,
        height: size.y,
        scale,
    }
}

/// Window size for an image of the given aspect ratio (width / height)
///
/// The long side of the image gets the matching side of the allowed box
/// (`SCREEN_FRACTION` of the screen); the result is shrunk if the other side
/// would overflow it.
pub fn initial_window_size(aspect_ratio: f32, screen: (u32, u32)) -> (u32, u32) {
    let limit = Vec2::new(screen.0 as f32, screen.1 as f32) * SCREEN_FRACTION;
    let aspect_ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        1.0
    };

    let mut size = if aspect_ratio > 1.0 {
        Vec2::new(limit.y * aspect_ratio, limit.y)
    } else {
        Vec2::new(limit.x, limit.x / aspect_ratio)
    };

    let overflow = (size / limit).max_element();
    if overflow > 1.0 {
        size /= overflow;
    }

    let size = size.round().max(Vec2::ONE);
    (size.x as u32, size.y as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_fit_wide_image_letterboxes_vertically() {
        let placement = fit_centered((200, 100), (400, 400), 1.0);
        assert!(approx(placement.scale, 2.0));
        assert!(approx(placement.width, 400.0));
        assert!(approx(placement.height, 200.0));
        assert!(approx(placement.x, 0.0));
        assert!(approx(placement.y, 100.0));
    }

    #[test]
    fn test_fit_tall_image_pillarboxes() {
        let placement = fit_centered((100, 400), (800, 600), 1.0);
        assert!(approx(placement.scale, 1.5));
        assert!(approx(placement.width, 150.0));
        assert!(approx(placement.x, 325.0));
        assert!(approx(placement.y, 0.0));
    }

    #[test]
    fn test_fit_with_margin() {
        let placement = fit_centered((100, 100), (200, 200), 0.95);
        assert!(approx(placement.width, 190.0));
        assert!(approx(placement.x, 5.0));
        assert!(approx(placement.y, 5.0));
    }

    #[test]
    fn test_window_size_landscape() {
        // 1920x1080 screen -> 1440x810 box
        assert_eq!(initial_window_size(4.0 / 3.0, (1920, 1080)), (1080, 810));
    }

    #[test]
    fn test_window_size_portrait_is_shrunk_to_fit() {
        let (width, height) = initial_window_size(0.5, (1920, 1080));
        assert_eq!((width, height), (405, 810));
    }

    #[test]
    fn test_window_size_panorama_is_shrunk_to_fit() {
        let (width, height) = initial_window_size(4.0, (1920, 1080));
        assert_eq!((width, height), (1440, 360));
    }

    #[test]
    fn test_window_size_degenerate_aspect() {
        let (width, height) = initial_window_size(f32::NAN, (1000, 1000));
        assert_eq!((width, height), (750, 750));
    }
}
