// src/display/geometry.rs
//
// Virtual screen geometry: maps the logical canvas the application draws
// into onto the physical display.
//
// Everything here is a pure function of its inputs. The canvas calls
// `compute_layout` whenever the display or the sizing configuration changes
// and keeps the resulting `ScreenLayout` until the next change.

use serde::{Deserialize, Serialize};

/// In non-fullscreen mode the canvas height is this fraction of its width,
/// leaving room for the title and soft-key bars of the emulated handset.
pub const FULLSCREEN_HEIGHT_RATIO: f32 = 0.85;

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// True if `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(x, y, (right - x).max(0), (bottom - y).max(0))
    }
}

/// Inputs of the sizing function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInput {
    pub display_width: i32,
    pub display_height: i32,
    /// Negative means "derive from the display aspect ratio".
    pub virtual_width: i32,
    /// Negative means "derive from the display aspect ratio".
    pub virtual_height: i32,
    pub fullscreen: bool,
    pub scale_to_fit: bool,
    pub keep_aspect_ratio: bool,
    /// Percent.
    pub scale_ratio: i32,
    /// Pixels at the bottom of the display taken by a fixed on-screen keyboard.
    pub keyboard_reserved_height: i32,
}

impl Default for SizingInput {
    fn default() -> Self {
        Self {
            display_width: 240,
            display_height: 320,
            virtual_width: -1,
            virtual_height: -1,
            fullscreen: false,
            scale_to_fit: true,
            keep_aspect_ratio: true,
            scale_ratio: 100,
            keyboard_reserved_height: 0,
        }
    }
}

/// Resolved virtual screen and its placement on the display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenLayout {
    pub display_width: i32,
    pub display_height: i32,
    /// Logical canvas width.
    pub width: i32,
    /// Logical canvas height (reduced when not in fullscreen mode).
    pub height: i32,
    /// Logical height the canvas would have in fullscreen mode.
    pub max_height: i32,
    /// Where the virtual screen is drawn on the display.
    pub placement: Rect,
}

impl ScreenLayout {
    pub fn screen_rect(&self) -> Rect {
        Rect::new(0, 0, self.display_width, self.display_height)
    }

    /// Converts display coordinates of a pointer into virtual screen coordinates.
    pub fn to_virtual(&self, x: f32, y: f32) -> (f32, f32) {
        let placement = self.placement;
        let vx = (x - placement.x as f32) * self.width as f32 / placement.width.max(1) as f32;
        let vy = (y - placement.y as f32) * self.height as f32 / placement.height.max(1) as f32;
        (vx, vy)
    }
}

/// `value * percent / 100` in wide arithmetic, saturated to `1..=i32::MAX`.
fn apply_ratio(value: i32, percent: i32) -> i32 {
    let scaled = i64::from(value) * i64::from(percent) / 100;
    scaled.clamp(1, i64::from(i32::MAX)) as i32
}

/// Computes the logical canvas size and its placement on the display.
pub fn compute_layout(input: &SizingInput) -> ScreenLayout {
    let display_width = input.display_width.max(1);
    let display_height = input.display_height.max(1);
    let scaled_display_height = (display_height - input.keyboard_reserved_height).max(1);

    // 1. Resolve automatic dimensions from the physical aspect ratio.
    let (width, full_height) = match (input.virtual_width < 0, input.virtual_height < 0) {
        (true, true) => (display_width, scaled_display_height),
        (true, false) => (
            display_width * input.virtual_height / scaled_display_height,
            input.virtual_height,
        ),
        (false, true) => (
            input.virtual_width,
            scaled_display_height * input.virtual_width / display_width,
        ),
        (false, false) => (input.virtual_width, input.virtual_height),
    };
    let width = width.max(1);
    let max_height = full_height.max(1);

    // 2. Leave room for the handset chrome unless fullscreen.
    let height = if input.fullscreen {
        max_height
    } else {
        ((width as f32 * FULLSCREEN_HEIGHT_RATIO).round() as i32).max(1)
    };

    // 3. Fit to the display.
    let (mut on_width, mut on_height) = if input.scale_to_fit {
        if input.keep_aspect_ratio {
            let fit_width = display_width;
            let fit_height = (height as f32 * display_width as f32 / width as f32) as i32;
            if fit_height > scaled_display_height {
                (
                    (width as f32 * scaled_display_height as f32 / height as f32) as i32,
                    scaled_display_height,
                )
            } else {
                (fit_width, fit_height)
            }
        } else {
            (display_width, scaled_display_height)
        }
    } else {
        (width, height)
    };

    // 4. Extra scale multiplier.
    on_width = apply_ratio(on_width, input.scale_ratio);
    on_height = apply_ratio(on_height, input.scale_ratio);

    // 5. Never spill over the display.
    if on_width > display_width || on_height > display_height {
        let shrink = f32::min(
            display_width as f32 / on_width as f32,
            display_height as f32 / on_height as f32,
        );
        on_width = (on_width as f32 * shrink) as i32;
        on_height = (on_height as f32 * shrink) as i32;
    }
    on_width = on_width.clamp(1, display_width);
    on_height = on_height.clamp(1, display_height);

    // 6. Landscape: center both ways. Portrait: the device is held by its
    // bottom edge, so anchor the virtual screen to the top.
    let on_x = (display_width - on_width) / 2;
    let on_y = if display_width >= display_height {
        (display_height - on_height) / 2
    } else {
        0
    };

    ScreenLayout {
        display_width,
        display_height,
        width,
        height,
        max_height,
        placement: Rect::new(on_x, on_y, on_width, on_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aspect(w: i32, h: i32) -> f32 {
        w as f32 / h as f32
    }

    #[test]
    fn auto_size_portrait_phone_windowed() {
        let layout = compute_layout(&SizingInput {
            display_width: 1080,
            display_height: 1920,
            ..SizingInput::default()
        });

        assert_eq!(layout.width, 1080);
        assert_eq!(layout.height, (1080.0f32 * 0.85).round() as i32);
        assert_eq!(layout.max_height, 1920);
        assert!(layout.screen_rect().contains_rect(&layout.placement));
        let logical = aspect(layout.width, layout.height);
        let placed = aspect(layout.placement.width, layout.placement.height);
        assert!((logical - placed).abs() < 0.01, "{} vs {}", logical, placed);
        // Portrait: anchored to the top, centered horizontally.
        assert_eq!(layout.placement.y, 0);
        assert_eq!(layout.placement.x, 0);
    }

    #[test]
    fn width_only_virtual_size_follows_display_aspect() {
        let layout = compute_layout(&SizingInput {
            display_width: 480,
            display_height: 800,
            virtual_width: 240,
            virtual_height: -1,
            fullscreen: true,
            ..SizingInput::default()
        });
        assert_eq!(layout.width, 240);
        assert_eq!(layout.max_height, 400);
        assert_eq!(layout.height, 400);
        assert_eq!(layout.placement, Rect::new(0, 0, 480, 800));
    }

    #[test]
    fn windowed_mode_keeps_full_height_as_max() {
        let layout = compute_layout(&SizingInput {
            display_width: 480,
            display_height: 800,
            virtual_width: 240,
            ..SizingInput::default()
        });
        assert_eq!(layout.max_height, 400);
        assert_eq!(layout.height, 204);
    }

    #[test]
    fn height_only_virtual_size_follows_display_aspect() {
        let layout = compute_layout(&SizingInput {
            display_width: 480,
            display_height: 800,
            virtual_height: 320,
            fullscreen: true,
            ..SizingInput::default()
        });
        assert_eq!(layout.width, 192);
        assert_eq!(layout.height, 320);
    }

    #[test]
    fn landscape_falls_back_to_height_fit_and_centers() {
        let layout = compute_layout(&SizingInput {
            display_width: 800,
            display_height: 480,
            virtual_width: 240,
            virtual_height: 320,
            fullscreen: true,
            ..SizingInput::default()
        });
        assert_eq!(layout.placement.height, 480);
        assert_eq!(layout.placement.width, 360);
        assert_eq!(layout.placement.x, 220);
        assert_eq!(layout.placement.y, 0);
    }

    #[test]
    fn stretch_ignores_aspect_ratio() {
        let layout = compute_layout(&SizingInput {
            display_width: 800,
            display_height: 480,
            virtual_width: 240,
            virtual_height: 320,
            fullscreen: true,
            keep_aspect_ratio: false,
            ..SizingInput::default()
        });
        assert_eq!(layout.placement, Rect::new(0, 0, 800, 480));
    }

    #[test]
    fn no_scaling_uses_logical_size_centered() {
        let layout = compute_layout(&SizingInput {
            display_width: 800,
            display_height: 480,
            virtual_width: 240,
            virtual_height: 320,
            fullscreen: true,
            scale_to_fit: false,
            ..SizingInput::default()
        });
        assert_eq!(layout.placement, Rect::new(280, 80, 240, 320));
    }

    #[test]
    fn scale_ratio_shrinks_placement() {
        let layout = compute_layout(&SizingInput {
            display_width: 480,
            display_height: 800,
            virtual_width: 240,
            virtual_height: 320,
            fullscreen: true,
            scale_ratio: 50,
            ..SizingInput::default()
        });
        assert_eq!(layout.placement, Rect::new(120, 0, 240, 320));
    }

    #[test]
    fn oversized_scale_ratio_is_clamped_to_the_display() {
        let layout = compute_layout(&SizingInput {
            display_width: 480,
            display_height: 800,
            virtual_width: 240,
            virtual_height: 320,
            fullscreen: true,
            scale_ratio: 300,
            ..SizingInput::default()
        });
        assert!(layout.screen_rect().contains_rect(&layout.placement));
        assert_eq!(layout.placement.width, 480);
        assert_eq!(layout.placement.height, 640);
    }

    #[test]
    fn keyboard_reservation_shrinks_usable_height() {
        let layout = compute_layout(&SizingInput {
            display_width: 480,
            display_height: 800,
            fullscreen: true,
            keyboard_reserved_height: 401,
            ..SizingInput::default()
        });
        assert_eq!(layout.width, 480);
        assert_eq!(layout.height, 399);
        assert_eq!(layout.placement, Rect::new(0, 0, 480, 399));
    }

    #[test]
    fn pointer_translation_inverts_placement() {
        let layout = compute_layout(&SizingInput {
            display_width: 800,
            display_height: 480,
            virtual_width: 240,
            virtual_height: 320,
            fullscreen: true,
            ..SizingInput::default()
        });
        let (x, y) = layout.to_virtual(220.0, 0.0);
        assert_eq!((x, y), (0.0, 0.0));
        let (x, y) = layout.to_virtual(220.0 + 180.0, 240.0);
        assert_eq!((x, y), (120.0, 160.0));
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Rect::new(5, 5, 5, 5));
        assert!(a.intersection(&Rect::new(20, 20, 1, 1)).is_empty());
    }

    #[test]
    fn huge_scale_ratio_saturates_and_still_fits() {
        let layout = compute_layout(&SizingInput {
            display_width: 1080,
            display_height: 1920,
            scale_ratio: i32::MAX,
            ..SizingInput::default()
        });
        assert!(layout.screen_rect().contains_rect(&layout.placement));
        assert!(!layout.placement.is_empty());
    }
}
