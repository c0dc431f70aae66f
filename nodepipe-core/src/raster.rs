//! Image Capability - the pixel container every operation works on
//!
//! A thin wrapper over [`image::RgbaImage`]. Decoding, encoding and the
//! luminance formula are owned by the `image` crate.

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageResult, Pixel, Rgba, RgbaImage};

/// Extension of every artifact the engine writes.
pub const IMAGE_EXTENSION: &str = "png";

/// Base name of the final artifact written by [`Image::save_final`].
pub const FINAL_ARTIFACT_STEM: &str = "output";

/// An in-memory RGBA image with 8-bit channels.
#[derive(Clone, PartialEq, Eq)]
pub struct Image(RgbaImage);

impl Image {
    /// Decode an image file, converting whatever it holds to RGBA8
    pub fn open(path: impl AsRef<Path>) -> ImageResult<Self> {
        Ok(Self(image::open(path)?.to_rgba8()))
    }

    /// A fully transparent black image
    pub fn blank(width: u32, height: u32) -> Self {
        Self(RgbaImage::new(width, height))
    }

    /// An image where every pixel is `color`
    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self(RgbaImage::from_pixel(width, height, color))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn size(&self) -> [u32; 2] {
        [self.0.width(), self.0.height()]
    }

    /// Panics if `(x, y)` is outside the image, like [`RgbaImage::get_pixel`].
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.0.get_pixel(x, y)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        self.0.put_pixel(x, y, color);
    }

    /// Replace every pixel with its luminance on R, G and B. Alpha is kept.
    pub fn to_grayscale(&mut self) {
        for pixel in self.0.pixels_mut() {
            let [l] = pixel.to_luma().0;
            let [_, _, _, a] = pixel.0;
            *pixel = Rgba([l, l, l, a]);
        }
    }

    /// Encode as PNG at exactly `path`
    pub fn save(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.0.save_with_format(path, ImageFormat::Png)
    }

    /// Write the final artifact into `dir` under the fixed base name, returning its path
    pub fn save_final(&self, dir: impl AsRef<Path>) -> ImageResult<PathBuf> {
        let path = artifact_path(dir.as_ref(), FINAL_ARTIFACT_STEM);
        self.save(&path)?;
        Ok(path)
    }
}

/// `<dir>/<stem>.png`
pub fn artifact_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, IMAGE_EXTENSION))
}

impl From<RgbaImage> for Image {
    fn from(inner: RgbaImage) -> Self {
        Self(inner)
    }
}

impl Deref for Image {
    type Target = RgbaImage;

    fn deref(&self) -> &RgbaImage {
        &self.0
    }
}

impl DerefMut for Image {
    fn deref_mut(&mut self) -> &mut RgbaImage {
        &mut self.0
    }
}

impl Display for Image {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

// Dimensions only
impl Debug for Image {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Image({}x{})", self.width(), self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_keeps_alpha() {
        let mut img = Image::filled(2, 1, Rgba([200, 10, 40, 77]));
        img.to_grayscale();
        let [r, g, b, a] = img.pixel(1, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 77);
    }

    #[test]
    fn test_display_describes_dimensions() {
        let img = Image::blank(640, 480);
        assert_eq!(img.to_string(), "640x480");
        assert_eq!(format!("{:?}", img), "Image(640x480)");
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = Image::blank(3, 2);
        img.set_pixel(2, 1, Rgba([1, 2, 3, 255]));

        let path = img.save_final(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("output.png"));

        let back = Image::open(&path).unwrap();
        assert_eq!(back, img);
    }
}
