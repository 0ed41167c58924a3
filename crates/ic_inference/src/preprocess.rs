use ic_core::{DecodedImage, Error, InputLayout, Result};
use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayD, IxDyn};

/// Maps a channel value from `[0, 255]` to `[-1, 1]`.
pub fn normalize(value: u8) -> f32 {
    (value as f32 - 127.5) / 127.5
}

/// All-zero input used to warm the backend up.
pub fn zeros(size: u32, layout: InputLayout) -> ArrayD<f32> {
    ArrayD::zeros(IxDyn(&layout.input_shape(size)))
}

/// Resize `image` to `size x size` and lay it out as a batch of one.
pub fn image_to_tensor(image: &DecodedImage, size: u32, layout: InputLayout) -> Result<ArrayD<f32>> {
    if size == 0 {
        return Err(Error::Inference("input size must be positive".to_string()));
    }

    let source = image.pixels();
    let resized;
    let pixels = if source.dimensions() == (size, size) {
        source
    } else {
        resized = imageops::resize(source, size, size, FilterType::Triangle);
        &resized
    };

    let s = size as usize;
    let tensor = match layout {
        InputLayout::Nhwc => Array4::from_shape_fn((1, s, s, 3), |(_, y, x, c)| {
            normalize(pixels.get_pixel(x as u32, y as u32)[c])
        }),
        InputLayout::Nchw => Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| {
            normalize(pixels.get_pixel(x as u32, y as u32)[c])
        }),
    };
    Ok(tensor.into_dyn())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn image(width: u32, height: u32, pixel: [u8; 3]) -> DecodedImage {
        DecodedImage::from_rgb("test", RgbImage::from_pixel(width, height, Rgb(pixel))).unwrap()
    }

    #[test]
    fn test_normalize_range() {
        assert_eq!(normalize(0), -1.0);
        assert_eq!(normalize(255), 1.0);
        assert!(normalize(128).abs() < 0.01);
    }

    #[test]
    fn test_zeros_shape() {
        let warmup = zeros(224, InputLayout::Nhwc);
        assert_eq!(warmup.shape(), &[1, 224, 224, 3]);
        assert!(warmup.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_resizes_to_input_size() {
        let tensor = image_to_tensor(&image(64, 40, [255, 0, 128]), 16, InputLayout::Nhwc).unwrap();
        assert_eq!(tensor.shape(), &[1, 16, 16, 3]);
        assert!((tensor[[0, 5, 7, 0]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 5, 7, 1]] + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_channels_first_layout() {
        let tensor = image_to_tensor(&image(8, 8, [0, 255, 0]), 8, InputLayout::Nchw).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
        assert_eq!(tensor[[0, 0, 3, 3]], -1.0);
        assert_eq!(tensor[[0, 1, 3, 3]], 1.0);
        assert_eq!(tensor[[0, 2, 3, 3]], -1.0);
    }

    #[test]
    fn test_zero_size_rejected() {
        let result = image_to_tensor(&image(2, 2, [0, 0, 0]), 0, InputLayout::Nhwc);
        assert!(matches!(result, Err(Error::Inference(_))));
    }
}
