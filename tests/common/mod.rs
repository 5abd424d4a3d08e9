#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::*;
use burn::tensor::activation::tanh;
use image::{Rgb, RgbImage};

use layerforge::config::{
    EnumerationStrategy, Preprocess, TrainOptions, TransformOptions,
};
use layerforge::networks::{Critic, Networks, Translator};
use layerforge::source::strategies::{group_role_directory, pair_directory};

pub const SIZE: u32 = 8;

pub const OBJECT_VALUE: u8 = 255;
pub const SCENE_VALUE: u8 = 64;
pub const STRUCTURE_VALUE: u8 = 192;
pub const IMAGE_VALUE: u8 = 128;

/// Value a pixel byte takes after normalization to `[-1, 1]`.
pub fn normalized(value: u8) -> f32 {
    (value as f32 / 255.0 - 0.5) / 0.5
}

pub fn write_uniform(path: &Path, value: u8) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(SIZE, SIZE, Rgb([value, value, value]))
        .save(path)
        .unwrap();
}

/// Object layer present (`OBJECT_VALUE`) in the left half, absent (black) in the right half.
pub fn write_half_object(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(SIZE, SIZE, |x, _| {
        if x < SIZE / 2 {
            Rgb([OBJECT_VALUE; 3])
        } else {
            Rgb([0; 3])
        }
    })
    .save(path)
    .unwrap();
}

fn role_value(role: &str) -> u8 {
    match role {
        "scene" => SCENE_VALUE,
        "structure" => STRUCTURE_VALUE,
        _ => IMAGE_VALUE,
    }
}

/// Write `counts[g]` files for every role of group `groups[g]`.
pub fn write_grouped(root: &Path, phase: &str, groups: &[(&str, usize)], roles: &[&str]) {
    for (group, count) in groups {
        for role in roles {
            let directory = group_role_directory(root, phase, group, role);
            for index in 0..*count {
                let path = directory.join(format!("{group}_{index:04}.png"));
                if *role == "object" {
                    write_half_object(&path);
                } else {
                    write_uniform(&path, role_value(role));
                }
            }
        }
    }
}

/// Write `count` photo/label pairs of one ADE20K scene class.
pub fn write_pairs(root: &Path, phase: &str, class: &str, count: usize) -> PathBuf {
    let directory = pair_directory(root, phase, class);
    for index in 0..count {
        write_uniform(
            &directory.join(format!("ADE_{index:04}.jpg")),
            IMAGE_VALUE,
        );
        write_uniform(&directory.join(format!("ADE_{index:04}_seg.png")), 32);
    }
    directory
}

/// Cyclic options over `groups` with tiny, flip-free transforms.
pub fn cyclic_options(root: &Path, groups: &[&str]) -> TrainOptions {
    let mut options = TrainOptions::advnet_cyclic(root);
    options.dataset.strategy = EnumerationStrategy::Grouped {
        groups: groups.iter().map(|group| group.to_string()).collect(),
    };
    options.dataset.transform = tiny_transform();
    options
}

/// Paired object/scene options over `groups` with tiny, flip-free transforms.
pub fn paired_options(root: &Path, groups: &[&str]) -> TrainOptions {
    let mut options = TrainOptions::advnet_paired(root);
    options.dataset.strategy = EnumerationStrategy::Grouped {
        groups: groups.iter().map(|group| group.to_string()).collect(),
    };
    options.dataset.transform = tiny_transform();
    options
}

pub fn tiny_transform() -> TransformOptions {
    TransformOptions::default()
        .with_preprocess(Preprocess::None)
        .with_no_flip(true)
}

/// 1×1 convolution generator squashed into `[-1, 1]`.
#[derive(Module, Debug)]
pub struct PixelTranslator<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> PixelTranslator<B> {
    pub fn new(input: usize, output: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([input, output], [1, 1]).init(device),
        }
    }
}

impl<B: Backend> Translator<B> for PixelTranslator<B> {
    fn translate(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        tanh(self.conv.forward(input))
    }
}

/// 1×1 convolution patch discriminator.
#[derive(Module, Debug)]
pub struct PixelCritic<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> PixelCritic<B> {
    pub fn new(input: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([input, 1], [1, 1]).init(device),
        }
    }
}

impl<B: Backend> Critic<B> for PixelCritic<B> {
    fn critique(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(input)
    }
}

/// Generator wrapper counting `translate` calls.
#[derive(Debug)]
pub struct CountingTranslator<B: Backend> {
    inner: PixelTranslator<B>,
    calls: Arc<AtomicUsize>,
}

impl<B: Backend> CountingTranslator<B> {
    pub fn new(inner: PixelTranslator<B>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl<B: Backend> Translator<B> for CountingTranslator<B> {
    fn translate(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.translate(input)
    }
}

pub fn cyclic_networks<B: Backend>(
    options: &TrainOptions,
    device: &B::Device,
) -> Networks<PixelTranslator<B>, PixelCritic<B>> {
    Networks::Cyclic {
        g_a: PixelTranslator::new(options.input_nc, options.output_nc, device),
        g_b: PixelTranslator::new(options.output_nc, options.effective_input2_nc(), device),
        d_a: PixelCritic::new(options.output_nc, device),
        d_b: PixelCritic::new(options.effective_input2_nc(), device),
    }
}

pub fn paired_networks<B: Backend>(
    options: &TrainOptions,
    device: &B::Device,
) -> Networks<PixelTranslator<B>, PixelCritic<B>> {
    Networks::Paired {
        generator: PixelTranslator::new(options.input_nc, options.output_nc, device),
        discriminator: PixelCritic::new(options.input_nc + options.output_nc, device),
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}
