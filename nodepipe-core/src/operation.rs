//! Operation (Node) - one step of a pipeline
//!
//! The set of operations is closed: every variant is dispatched through a
//! single `match` in [`Operation::apply`].

use std::fmt::{self, Display, Formatter};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pixel_ops;
use crate::raster::Image;

#[derive(Debug, Error, PartialEq)]
pub enum OperationError {
    #[error(
        "crop of {width}x{height} at ({origin_x}, {origin_y}) exceeds source image {image_width}x{image_height}"
    )]
    OutOfBounds {
        origin_x: i64,
        origin_y: i64,
        width: i64,
        height: i64,
        image_width: u32,
        image_height: u32,
    },

    #[error("crop size must be positive, got {width}x{height}")]
    EmptyCrop { width: i64, height: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    GreyScale,
    Normalise,
    Vignette,
    Noise {
        amount: f64,
    },
    #[serde(rename_all = "camelCase")]
    Crop {
        origin_x: i64,
        origin_y: i64,
        width: i64,
        height: i64,
    },
}

impl Operation {
    /// Display name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::GreyScale => "GreyScale",
            Self::Normalise => "Normalise",
            Self::Vignette => "Vignette",
            Self::Noise { .. } => "Noise",
            Self::Crop { .. } => "Crop",
        }
    }

    /// The keyword that selects this operation in a pipeline definition
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::GreyScale => "greyscale",
            Self::Normalise => "normalise",
            Self::Vignette => "vignette",
            Self::Noise { .. } => "noise",
            Self::Crop { .. } => "crop",
        }
    }

    /// Human-readable parameters, empty for operations that take none
    pub fn other_info(&self) -> String {
        match self {
            Self::GreyScale | Self::Normalise | Self::Vignette => String::new(),
            Self::Noise { amount } => format!("(noiseAmount={})", amount),
            Self::Crop {
                origin_x,
                origin_y,
                width,
                height,
            } => format!(
                "(origin=({},{}), size=({},{}))",
                origin_x, origin_y, width, height
            ),
        }
    }

    /// Transform `image` in place.
    ///
    /// On error `image` is left exactly as it was.
    pub fn apply<R: Rng>(&self, image: &mut Image, rng: &mut R) -> Result<(), OperationError> {
        match *self {
            Self::GreyScale => pixel_ops::greyscale(image),
            Self::Normalise => pixel_ops::normalise(image),
            Self::Vignette => pixel_ops::vignette(image),
            Self::Noise { amount } => pixel_ops::noise(image, amount, rng),
            Self::Crop {
                origin_x,
                origin_y,
                width,
                height,
            } => pixel_ops::crop(image, origin_x, origin_y, width, height)?,
        }
        Ok(())
    }

    /// By-value form of [`apply`](Self::apply)
    pub fn process<R: Rng>(&self, mut image: Image, rng: &mut R) -> Result<Image, OperationError> {
        self.apply(&mut image, rng)?;
        Ok(image)
    }
}

/// Renders the canonical definition line, which parses back to `self`
impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "node={}", self.keyword())?;
        match self {
            Self::GreyScale | Self::Normalise | Self::Vignette => Ok(()),
            Self::Noise { amount } => write!(f, " noiseValue={}", amount),
            Self::Crop {
                origin_x,
                origin_y,
                width,
                height,
            } => write!(
                f,
                " origin={}x{} size={}x{}",
                origin_x, origin_y, width, height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn test_other_info() {
        assert_eq!(Operation::Vignette.other_info(), "");
        assert_eq!(
            Operation::Noise { amount: 0.25 }.other_info(),
            "(noiseAmount=0.25)"
        );
        let crop = Operation::Crop {
            origin_x: 1,
            origin_y: 2,
            width: 3,
            height: 4,
        };
        assert_eq!(crop.other_info(), "(origin=(1,2), size=(3,4))");
        assert_eq!(crop.name(), "Crop");
    }

    #[test]
    fn test_display_is_definition_line() {
        let crop = Operation::Crop {
            origin_x: 10,
            origin_y: 20,
            width: 30,
            height: 40,
        };
        assert_eq!(crop.to_string(), "node=crop origin=10x20 size=30x40");
        assert_eq!(
            Operation::Noise { amount: 0.5 }.to_string(),
            "node=noise noiseValue=0.5"
        );
        assert_eq!(Operation::GreyScale.to_string(), "node=greyscale");
    }

    #[test]
    fn test_process_crop_replaces_image() {
        let img = Image::filled(10, 10, Rgba([1, 2, 3, 4]));
        let crop = Operation::Crop {
            origin_x: 2,
            origin_y: 3,
            width: 4,
            height: 5,
        };
        let out = crop.process(img, &mut rng()).unwrap();
        assert_eq!(out.size(), [4, 5]);
    }

    #[test]
    fn test_failed_apply_leaves_image() {
        let mut img = Image::filled(4, 4, Rgba([9, 9, 9, 9]));
        let before = img.clone();
        let crop = Operation::Crop {
            origin_x: 3,
            origin_y: 3,
            width: 2,
            height: 2,
        };
        let err = crop.apply(&mut img, &mut rng()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "crop of 2x2 at (3, 3) exceeds source image 4x4"
        );
        assert_eq!(img, before);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(Operation::Crop {
            origin_x: 1,
            origin_y: 2,
            width: 3,
            height: 4,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "crop", "originX": 1, "originY": 2, "width": 3, "height": 4})
        );
        let noise: Operation = serde_json::from_str(r#"{"kind":"noise","amount":0.1}"#).unwrap();
        assert_eq!(noise, Operation::Noise { amount: 0.1 });
    }
}
