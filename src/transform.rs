//! Image decoding and the pixel transform applied before tensor conversion.
//!
//! The transform is pluggable through [`SampleTransform`]; the provider draws
//! [`TransformParams`] once per record (shared across roles) or once per role,
//! depending on the role layout.

use std::path::Path;

use burn::tensor::TensorData;
use image::DynamicImage;
use image::imageops::FilterType;
use rand::Rng;

use crate::config::{Preprocess, TransformOptions};
use crate::constants::transform::{FLIP_THRESHOLD, POWER_BASE};
use crate::errors::TrainError;
use crate::rng::DeterministicRng;

/// Randomly drawn geometric parameters for one record (or one role).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformParams {
    /// Top-left `(x, y)` of the crop window.
    pub crop_origin: (u32, u32),
    /// Whether to mirror horizontally.
    pub flip: bool,
}

/// Pixel transform turning a decoded image into a normalized `[C, H, W]` tensor.
pub trait SampleTransform: Send + Sync {
    /// Draw parameters for an image of `(width, height)`.
    fn params(&self, size: (u32, u32), rng: &mut DeterministicRng) -> TransformParams;

    /// Transform `image` with `params` into a `[channels, H, W]` tensor in `[-1, 1]`.
    fn apply(
        &self,
        image: DynamicImage,
        params: &TransformParams,
        channels: usize,
    ) -> Result<TensorData, TrainError>;
}

/// Resize/crop/flip pipeline driven by [`TransformOptions`].
#[derive(Clone, Debug, Default)]
pub struct StandardTransform {
    options: TransformOptions,
}

impl StandardTransform {
    /// Create a transform from the configured toggles.
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    /// Configured toggles.
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    fn resized(&self, image: DynamicImage) -> DynamicImage {
        let options = &self.options;
        match options.preprocess {
            Preprocess::ResizeAndCrop => {
                image.resize_exact(options.load_size, options.load_size, FilterType::CatmullRom)
            }
            Preprocess::ScaleWidth | Preprocess::ScaleWidthAndCrop => {
                scale_width(image, options.load_size, options.crop_size)
            }
            Preprocess::Crop => image,
            Preprocess::None => make_power_2(image, POWER_BASE),
        }
    }
}

impl SampleTransform for StandardTransform {
    fn params(&self, size: (u32, u32), rng: &mut DeterministicRng) -> TransformParams {
        let options = &self.options;
        let (width, height) = size;
        let (new_width, new_height) = match options.preprocess {
            Preprocess::ResizeAndCrop => (options.load_size, options.load_size),
            Preprocess::ScaleWidthAndCrop => (
                options.load_size,
                scaled_height(width, height, options.load_size),
            ),
            _ => (width, height),
        };
        let x = rng.random_range(0..=new_width.saturating_sub(options.crop_size));
        let y = rng.random_range(0..=new_height.saturating_sub(options.crop_size));
        let flip = rng.random::<f64>() > FLIP_THRESHOLD;
        TransformParams {
            crop_origin: (x, y),
            flip,
        }
    }

    fn apply(
        &self,
        image: DynamicImage,
        params: &TransformParams,
        channels: usize,
    ) -> Result<TensorData, TrainError> {
        let options = &self.options;
        let image = if channels == 1 {
            DynamicImage::ImageLuma8(image.to_luma8())
        } else {
            image
        };
        let mut image = self.resized(image);
        if matches!(
            options.preprocess,
            Preprocess::ResizeAndCrop | Preprocess::Crop | Preprocess::ScaleWidthAndCrop
        ) && (image.width() > options.crop_size || image.height() > options.crop_size)
        {
            let (x, y) = params.crop_origin;
            image = image.crop_imm(x, y, options.crop_size, options.crop_size);
        }
        if !options.no_flip && params.flip {
            image = image.fliph();
        }
        to_normalized_tensor(&image, channels)
    }
}

/// Decode `path` from disk.
pub fn decode_image(path: &Path) -> Result<DynamicImage, TrainError> {
    image::open(path).map_err(|source| TrainError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert an image into a `[channels, H, W]` tensor normalized with mean and std 0.5.
pub fn to_normalized_tensor(
    image: &DynamicImage,
    channels: usize,
) -> Result<TensorData, TrainError> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let plane = width * height;
    let mut values = vec![0.0f32; channels * plane];
    match channels {
        1 => {
            for (idx, pixel) in image.to_luma8().pixels().enumerate() {
                values[idx] = normalize(pixel.0[0]);
            }
        }
        3 => {
            for (idx, pixel) in image.to_rgb8().pixels().enumerate() {
                for (channel, value) in pixel.0.iter().enumerate() {
                    values[channel * plane + idx] = normalize(*value);
                }
            }
        }
        other => {
            return Err(TrainError::Configuration(format!(
                "cannot convert an image into {other} channels"
            )));
        }
    }
    Ok(TensorData::new(values, [channels, height, width]))
}

fn normalize(value: u8) -> f32 {
    (value as f32 / 255.0 - 0.5) / 0.5
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height;
    }
    ((target_width as u64 * height as u64) / width as u64) as u32
}

fn scale_width(image: DynamicImage, target_width: u32, crop_size: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width == target_width && height >= crop_size {
        return image;
    }
    let new_height = scaled_height(width, height, target_width).max(crop_size);
    image.resize_exact(target_width, new_height, FilterType::CatmullRom)
}

fn make_power_2(image: DynamicImage, base: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let round = |side: u32| (((side as f64) / base as f64).round() as u32 * base).max(base);
    let (new_width, new_height) = (round(width), round(height));
    if new_width == width && new_height == height {
        return image;
    }
    image.resize_exact(new_width, new_height, FilterType::CatmullRom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, 255])
        }))
    }

    #[test]
    fn tensor_is_channel_major_and_normalized() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([0, 255, 0]) } else { Rgb([255, 0, 255]) }
        }));
        let data = to_normalized_tensor(&image, 3).unwrap();
        assert_eq!(data.shape, vec![3, 1, 2]);
        assert_eq!(
            data.to_vec::<f32>().unwrap(),
            vec![-1.0, 1.0, 1.0, -1.0, -1.0, 1.0]
        );
    }

    #[test]
    fn single_channel_roles_decode_as_grayscale() {
        let transform = StandardTransform::new(
            TransformOptions::default()
                .with_preprocess(Preprocess::None)
                .with_no_flip(true),
        );
        let data = transform
            .apply(gradient(8, 4), &TransformParams::default(), 1)
            .unwrap();
        assert_eq!(data.shape, vec![1, 4, 8]);
    }

    #[test]
    fn resize_and_crop_yields_crop_size() {
        let transform = StandardTransform::new(TransformOptions::default().with_sizes(12, 8));
        let mut rng = DeterministicRng::new(5);
        let params = transform.params((20, 30), &mut rng);
        assert!(params.crop_origin.0 <= 4 && params.crop_origin.1 <= 4);
        let data = transform.apply(gradient(20, 30), &params, 3).unwrap();
        assert_eq!(data.shape, vec![3, 8, 8]);
    }

    #[test]
    fn no_preprocess_rounds_to_multiple_of_four() {
        let transform =
            StandardTransform::new(TransformOptions::default().with_preprocess(Preprocess::None));
        let data = transform
            .apply(gradient(10, 7), &TransformParams::default(), 3)
            .unwrap();
        assert_eq!(data.shape, vec![3, 8, 12]);
    }

    #[test]
    fn flip_mirrors_columns_unless_disabled() {
        let options = TransformOptions::default().with_preprocess(Preprocess::None);
        let flipped = TransformParams {
            crop_origin: (0, 0),
            flip: true,
        };
        let plain = StandardTransform::new(options.clone())
            .apply(gradient(4, 4), &TransformParams::default(), 3)
            .unwrap()
            .to_vec::<f32>()
            .unwrap();
        let mirrored = StandardTransform::new(options.clone())
            .apply(gradient(4, 4), &flipped, 3)
            .unwrap()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(plain[0], mirrored[3]);
        let unflipped = StandardTransform::new(options.with_no_flip(true))
            .apply(gradient(4, 4), &flipped, 3)
            .unwrap()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(plain, unflipped);
    }

    #[test]
    fn params_are_reproducible_for_a_seed() {
        let transform = StandardTransform::default();
        let left = transform.params((300, 300), &mut DeterministicRng::new(11));
        let right = transform.params((300, 300), &mut DeterministicRng::new(11));
        assert_eq!(left, right);
    }
}
