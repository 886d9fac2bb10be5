use super::PdfBuilder;
use anyhow::{Context, Result, anyhow};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ColorType, DynamicImage};
use lopdf::{Stream, dictionary};
use std::io::Write;

/// 8-bit pixel data ready to be embedded as a PDF image XObject
#[derive(Debug)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    pub pixels: Vec<u8>,
}

/// Reduces any decoded image to a color model PDF can embed directly.
///
/// Opaque grayscale stays DeviceGray. Everything else (alpha, palette,
/// 16-bit, float, CMYK already converted by the decoder) becomes 8-bit RGB
/// with the alpha channel dropped.
pub fn flatten(image: DynamicImage) -> RasterImage {
    let (width, height) = (image.width(), image.height());
    match image.color() {
        ColorType::L8 | ColorType::L16 => RasterImage {
            width,
            height,
            color_space: "DeviceGray",
            pixels: image.to_luma8().into_raw(),
        },
        _ => RasterImage {
            width,
            height,
            color_space: "DeviceRGB",
            pixels: image.to_rgb8().into_raw(),
        },
    }
}

fn image_stream(raster: &RasterImage) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raster.pixels)?;
    let compressed = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => raster.width as i64,
        "Height" => raster.height as i64,
        "ColorSpace" => raster.color_space,
        "BitsPerComponent" => 8_i64,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed).with_compression(false))
}

/// Single-page PDF whose page matches the image size at 72 dpi
pub fn render_image(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).context("Cannot identify image file")?;
    let raster = flatten(decoded);
    if raster.width == 0 || raster.height == 0 {
        return Err(anyhow!("Image has no pixels"));
    }

    let mut builder = PdfBuilder::new();
    builder.add_image_page(
        raster.width as f32,
        raster.height as f32,
        image_stream(&raster)?,
    )?;
    builder.finish()
}
