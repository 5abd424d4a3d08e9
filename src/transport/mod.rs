/// Filesystem enumeration of image directories.
pub mod fs;

pub use fs::{ImageDirectory, has_suffix, is_image_file};
