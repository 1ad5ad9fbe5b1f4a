use crate::{
    config::TensorLayout,
    decode::{DecodedImage, PixelGrid},
};
use image::{imageops::FilterType, DynamicImage, GrayImage, RgbImage};
use ndarray::{Array, Ix4};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Pixel array has no positive intensity, cannot rescale to 8 bits")]
    EmptyDynamicRange,
    #[error("Pixel buffer does not match a {width}x{height} image with {samples_per_pixel} samples per pixel")]
    Shape {
        width: u32,
        height: u32,
        samples_per_pixel: u16,
    },
}

/// Stretches raw DICOM intensities to 8 bits: negatives are floored at zero
/// and the brightest sample maps to 255.
pub fn window_to_u8(grid: &PixelGrid) -> Result<DynamicImage, NormalizeError> {
    let max = grid
        .samples
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);

    // Also rejects NaN and empty grids.
    if !(max > 0.0) {
        return Err(NormalizeError::EmptyDynamicRange);
    }

    let scaled: Vec<u8> = grid
        .samples
        .iter()
        .map(|&value| (value.max(0.0) / max * 255.0) as u8)
        .collect();

    let shape_error = || NormalizeError::Shape {
        width: grid.width,
        height: grid.height,
        samples_per_pixel: grid.samples_per_pixel,
    };

    match grid.samples_per_pixel {
        1 => GrayImage::from_raw(grid.width, grid.height, scaled)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(shape_error),
        3 => RgbImage::from_raw(grid.width, grid.height, scaled)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(shape_error),
        _ => Err(shape_error()),
    }
}

/// Forces RGB, resizes to `image_size` square and lays the pixels out as a
/// batch of one. Values stay in `0.0..=255.0`: the model normalizes
/// internally.
pub fn to_model_input(image: &DynamicImage, image_size: u32, layout: TensorLayout) -> Array<f32, Ix4> {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, image_size, image_size, FilterType::CatmullRom);

    let mut input = Array::zeros(layout.shape(image_size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        for (channel, &value) in pixel.0.iter().enumerate() {
            match layout {
                TensorLayout::Nhwc => input[[0, y, x, channel]] = value as f32,
                TensorLayout::Nchw => input[[0, channel, y, x]] = value as f32,
            }
        }
    }

    input
}

pub fn normalize(
    decoded: DecodedImage,
    image_size: u32,
    layout: TensorLayout,
) -> Result<Array<f32, Ix4>, NormalizeError> {
    let image = match decoded {
        DecodedImage::Raster(image) => image,
        DecodedImage::Dicom(grid) => window_to_u8(&grid)?,
    };

    Ok(to_model_input(&image, image_size, layout))
}
