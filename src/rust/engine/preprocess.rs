use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

use crate::catalog::InputSpec;

/// Converts an image into the model input tensor.
///
/// The image is resized to the input size, converted to RGB and laid out as
/// `[batch=1, channels=3, height, width]`. Every channel value is scaled to
/// `[0, 1]` and then normalised with the per-channel mean and std.
pub fn image_to_tensor(image: &DynamicImage, spec: &InputSpec) -> Array4<f32> {
    let width = spec.width.max(1);
    let height = spec.height.max(1);
    let rgb = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            let std = if spec.std[channel].abs() > 1e-10 { spec.std[channel] } else { 1.0 };
            tensor[[0, channel, y as usize, x as usize]] = (value - spec.mean[channel]) / std;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_tensor_shape() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 48));
        let spec = InputSpec {
            width: 32,
            height: 16,
            ..InputSpec::default()
        };
        let tensor = image_to_tensor(&image, &spec);
        assert_eq!(tensor.shape(), &[1, 3, 16, 32]);
    }

    #[test]
    fn test_tensor_normalization() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 255])));
        let spec = InputSpec {
            width: 4,
            height: 4,
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.5, 0.5],
        };
        let tensor = image_to_tensor(&image, &spec);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-5);
        assert!((tensor[[0, 1, 2, 2]] + 1.0).abs() < 1e-5);
        assert!((tensor[[0, 2, 3, 3]] - 1.0).abs() < 1e-5);
    }
}
