use std::path::Path;

use image::{ImageResult, Rgb, Rgba, RgbaImage};
use nalgebra::Point2;

use crate::draw::Surface;

/// Software canvas that frames are replayed onto before being saved.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
    background: Rgb<u8>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        RasterSurface {
            image: RgbaImage::new(width, height),
            background,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.image.save(path)
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgb<u8>, alpha: f32) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let dst = pixel.0[c] as f32;
            let src = color.0[c] as f32;
            pixel.0[c] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
        }
        let dst_a = pixel.0[3] as f32 / 255.0;
        pixel.0[3] = ((alpha + dst_a * (1.0 - alpha)) * 255.0).round() as u8;
    }
}

impl Surface for RasterSurface {
    fn clear(&mut self) {
        let [r, g, b] = self.background.0;
        let fill = Rgba([r, g, b, 255]);
        for pixel in self.image.pixels_mut() {
            *pixel = fill;
        }
    }

    fn stroke_line(
        &mut self,
        from: Point2<f32>,
        to: Point2<f32>,
        color: Rgb<u8>,
        alpha: f32,
        _width: f32,
    ) {
        // One sample per pixel along the major axis; width is always one pixel here
        let delta = to - from;
        let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0) as usize;
        let increment = delta / steps as f32;
        let mut last = None;
        for i in 0..=steps {
            let p = from + increment * i as f32;
            let cell = (p.x.floor() as i64, p.y.floor() as i64);
            if last == Some(cell) {
                continue;
            }
            last = Some(cell);
            self.blend(cell.0, cell.1, color, alpha);
        }
    }

    fn fill_circle(&mut self, center: Point2<f32>, radius: f32, color: Rgb<u8>) {
        let r2 = radius * radius;
        // Bounding box clipped to the image
        let (w, h) = (self.image.width() as i64, self.image.height() as i64);
        let min_x = ((center.x - radius).floor() as i64).max(0);
        let max_x = ((center.x + radius).ceil() as i64).min(w - 1);
        let min_y = ((center.y - radius).floor() as i64).max(0);
        let max_y = ((center.y + radius).ceil() as i64).min(h - 1);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.blend(x, y, color, 1.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCENT: Rgb<u8> = Rgb([0, 243, 255]);

    #[test]
    fn clear_paints_background() {
        let mut surface = RasterSurface::new(4, 3, Rgb([10, 20, 30]));
        surface.clear();
        assert!(surface.image().pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn circle_is_solid_accent_at_center() {
        let mut surface = RasterSurface::new(20, 20, Rgb([0, 0, 0]));
        surface.clear();
        surface.fill_circle(Point2::new(10.0, 10.0), 3.0, ACCENT);
        assert_eq!(*surface.image().get_pixel(10, 10), Rgba([0, 243, 255, 255]));
        assert_eq!(*surface.image().get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn line_blends_with_alpha() {
        let mut surface = RasterSurface::new(10, 10, Rgb([0, 0, 0]));
        surface.clear();
        surface.stroke_line(Point2::new(0.0, 5.0), Point2::new(9.0, 5.0), ACCENT, 0.5, 1.0);
        for x in 0..10 {
            assert_eq!(*surface.image().get_pixel(x, 5), Rgba([0, 122, 128, 255]));
        }
        assert_eq!(*surface.image().get_pixel(5, 4), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn drawing_outside_is_clipped() {
        let mut surface = RasterSurface::new(5, 5, Rgb([0, 0, 0]));
        surface.clear();
        surface.fill_circle(Point2::new(-20.0, -20.0), 4.0, ACCENT);
        surface.stroke_line(Point2::new(-5.0, 2.0), Point2::new(2.0, 2.0), ACCENT, 1.0, 1.0);
        assert_eq!(*surface.image().get_pixel(2, 2), Rgba([0, 243, 255, 255]));
        assert_eq!(*surface.image().get_pixel(3, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn zero_length_line_plots_one_pixel() {
        let mut surface = RasterSurface::new(5, 5, Rgb([0, 0, 0]));
        surface.clear();
        surface.stroke_line(Point2::new(1.0, 1.0), Point2::new(1.0, 1.0), ACCENT, 1.0, 1.0);
        let lit = surface
            .image()
            .pixels()
            .filter(|p| **p != Rgba([0, 0, 0, 255]))
            .count();
        assert_eq!(lit, 1);
    }

    #[test]
    fn oversized_circle_covers_the_image() {
        let mut surface = RasterSurface::new(6, 4, Rgb([0, 0, 0]));
        surface.clear();
        surface.fill_circle(Point2::new(3.0, 2.0), 1e30, ACCENT);
        assert!(surface.image().pixels().all(|p| *p == Rgba([0, 243, 255, 255])));
    }

    #[test]
    fn zero_area_surface_ignores_drawing() {
        let mut surface = RasterSurface::new(0, 0, Rgb([0, 0, 0]));
        surface.clear();
        surface.fill_circle(Point2::new(0.0, 0.0), 3.0, ACCENT);
        surface.stroke_line(Point2::new(0.0, 0.0), Point2::new(5.0, 5.0), ACCENT, 0.5, 1.0);
        assert_eq!(surface.image().len(), 0);
    }

    #[test]
    fn resize_reallocates() {
        let mut surface = RasterSurface::new(5, 5, Rgb([0, 0, 0]));
        surface.resize(8, 2);
        assert_eq!((surface.width(), surface.height()), (8, 2));
    }
}
