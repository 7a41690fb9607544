//! Page rasters for hint providers.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::error::{Error, Result};
use crate::model::{BoundingBox, PagePrimitives};
use crate::render::images::{decode_region, encode_png};

/// Longest raster edge in pixels; larger pages are scaled down.
const MAX_EDGE_PX: f32 = 1568.0;

const TEXT_INK: Rgb<u8> = Rgb([64, 64, 64]);
const IMAGE_FILL: Rgb<u8> = Rgb([180, 180, 180]);
const TABLE_LINE: Rgb<u8> = Rgb([0, 0, 0]);

/// A PNG rendering of one page.
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    /// Page size in points, for mapping answers back to page space.
    pub page_width: f32,
    pub page_height: f32,
}

/// Turns page primitives into a raster a hint provider can look at.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, page: &PagePrimitives) -> Result<PageRaster>;
}

/// Paints a layout sketch: text lines as ink bars, images as their decoded
/// pixels (or a grey box), table regions as outlines.
#[derive(Debug, Clone)]
pub struct SketchRasterizer {
    dpi: f32,
}

impl Default for SketchRasterizer {
    fn default() -> Self {
        Self { dpi: 150.0 }
    }
}

impl SketchRasterizer {
    pub fn new(dpi: f32) -> Self {
        Self { dpi: dpi.max(1.0) }
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    fn scale_for(&self, width: f32, height: f32) -> f32 {
        let scale = self.dpi / 72.0;
        let longest = width.max(height) * scale;
        if longest > MAX_EDGE_PX {
            scale * MAX_EDGE_PX / longest
        } else {
            scale
        }
    }
}

/// Pixel rectangle for a box, or `None` if nothing would be visible.
fn pixel_rect(bbox: &BoundingBox, scale: f32, canvas: &RgbImage) -> Option<Rect> {
    let x0 = (bbox.x0 * scale).floor().max(0.0);
    let y0 = (bbox.y0 * scale).floor().max(0.0);
    let x1 = (bbox.x1 * scale).ceil().min(canvas.width() as f32);
    let y1 = (bbox.y1 * scale).ceil().min(canvas.height() as f32);
    if !(x1 > x0 && y1 > y0) {
        return None;
    }
    Some(Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32))
}

impl PageRasterizer for SketchRasterizer {
    fn rasterize(&self, page: &PagePrimitives) -> Result<PageRaster> {
        if !(page.width > 0.0 && page.height > 0.0) {
            return Err(Error::Render(format!("page {} has no area", page.page_index)));
        }
        let scale = self.scale_for(page.width, page.height);
        let width_px = ((page.width * scale).round() as u32).max(1);
        let height_px = ((page.height * scale).round() as u32).max(1);
        let mut canvas = RgbImage::from_pixel(width_px, height_px, Rgb([255, 255, 255]));

        for line in &page.lines {
            // Bars at 60% of the line height read as text at low resolution.
            let mut bar = line.bbox;
            let inset = line.bbox.height() * 0.2;
            bar.y0 += inset;
            bar.y1 -= inset;
            if let Some(rect) = pixel_rect(&bar, scale, &canvas) {
                draw_filled_rect_mut(&mut canvas, rect, TEXT_INK);
            }
        }

        for region in &page.images {
            let Some(rect) = pixel_rect(&region.bbox, scale, &canvas) else {
                continue;
            };
            match decode_region(region) {
                Ok(pixels) => {
                    let resized = pixels
                        .resize_exact(rect.width(), rect.height(), FilterType::Triangle)
                        .to_rgb8();
                    imageops::overlay(&mut canvas, &resized, i64::from(rect.left()), i64::from(rect.top()));
                }
                Err(e) => {
                    log::debug!("Sketching image as a box: {}", e);
                    draw_filled_rect_mut(&mut canvas, rect, IMAGE_FILL);
                }
            }
        }

        for table in &page.tables {
            if let Some(rect) = pixel_rect(&table.bbox, scale, &canvas) {
                draw_hollow_rect_mut(&mut canvas, rect, TABLE_LINE);
            }
        }

        let png = encode_png(&DynamicImage::ImageRgb8(canvas))?;
        Ok(PageRaster {
            png,
            width_px,
            height_px,
            page_width: page.width,
            page_height: page.height,
        })
    }
}
