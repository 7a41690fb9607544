//! Image decoding shared by the renderer and the page rasterizer.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::{Error, Result};
use crate::model::{ImageFormat, ImageRegion};

/// Decode an extracted image into pixels.
pub(crate) fn decode_region(region: &ImageRegion) -> Result<DynamicImage> {
    match &region.format {
        ImageFormat::Jpeg => Ok(image::load_from_memory_with_format(&region.data, image::ImageFormat::Jpeg)?),
        ImageFormat::Png => Ok(image::load_from_memory_with_format(&region.data, image::ImageFormat::Png)?),
        ImageFormat::Jpeg2000 => Err(Error::ImageDecode("JPEG 2000 is not supported".to_string())),
        ImageFormat::Raw {
            width,
            height,
            components,
        } => decode_raw(&region.data, *width, *height, *components),
    }
}

fn decode_raw(data: &[u8], width: u32, height: u32, components: u8) -> Result<DynamicImage> {
    let pixels = width as usize * height as usize;
    let needed = pixels * components as usize;
    if data.len() < needed {
        return Err(Error::ImageDecode(format!(
            "expected {} sample bytes, found {}",
            needed,
            data.len()
        )));
    }
    let samples = &data[..needed];
    let short = || Error::ImageDecode("sample buffer does not match dimensions".to_string());

    match components {
        1 => GrayImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(short),
        3 => RgbImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(short),
        4 => {
            let rgb: Vec<u8> = samples
                .chunks_exact(4)
                .flat_map(|p| {
                    let k = 255 - u16::from(p[3]);
                    [p[0], p[1], p[2]].map(|c| ((255 - u16::from(c)) * k / 255) as u8)
                })
                .collect();
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(short)
        }
        n => Err(Error::ImageDecode(format!("{} color components", n))),
    }
}

/// Encode pixels as PNG.
pub(crate) fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}
