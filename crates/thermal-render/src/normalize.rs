//! Min-max normalization to 8-bit intensity

use image::GrayImage;
use ndarray::ArrayViewD;

use crate::RenderError;

/// Height and width after dropping every axis of length 1.
///
/// A fully squeezed scalar is a 1×1 map and a vector is a single row. More
/// than two non-singleton axes, or an empty axis, is a shape error.
pub fn spatial_dims(shape: &[usize]) -> Result<(usize, usize), RenderError> {
    if shape.iter().any(|&d| d == 0) {
        return Err(RenderError::Shape(shape.to_vec()));
    }
    let kept: Vec<usize> = shape.iter().copied().filter(|&d| d != 1).collect();
    match kept.as_slice() {
        [] => Ok((1, 1)),
        [w] => Ok((1, *w)),
        [h, w] => Ok((*h, *w)),
        _ => Err(RenderError::Shape(shape.to_vec())),
    }
}

/// Rescale a thermal map to the full 0..=255 range.
///
/// `pixel = round((v - min) / (max - min) * 255)`, computed over this map
/// only. A constant map yields all zeros.
pub fn normalize_intensity(thermal: ArrayViewD<'_, f32>) -> Result<GrayImage, RenderError> {
    let (height, width) = spatial_dims(thermal.shape())?;

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in thermal.iter() {
        if !v.is_finite() {
            return Err(RenderError::NonFinite);
        }
        let v = v as f64;
        min = min.min(v);
        max = max.max(v);
    }

    let range = max - min;
    let pixels: Vec<u8> = if range > 0.0 {
        thermal
            .iter()
            .map(|&v| ((v as f64 - min) / range * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect()
    } else {
        vec![0; height * width]
    };

    GrayImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| RenderError::Shape(thermal.shape().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use proptest::prelude::*;

    fn map(shape: &[usize], data: Vec<f32>) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(shape), data).unwrap()
    }

    #[test]
    fn test_spatial_dims_squeeze() {
        assert_eq!(spatial_dims(&[1, 8, 6, 1]).unwrap(), (8, 6));
        assert_eq!(spatial_dims(&[8, 6]).unwrap(), (8, 6));
        assert_eq!(spatial_dims(&[1, 1, 5]).unwrap(), (1, 5));
        assert_eq!(spatial_dims(&[1, 1]).unwrap(), (1, 1));
        assert!(matches!(spatial_dims(&[2, 3, 4]), Err(RenderError::Shape(_))));
        assert!(matches!(spatial_dims(&[1, 0, 4]), Err(RenderError::Shape(_))));
    }

    #[test]
    fn test_min_max_stretch() {
        let thermal = map(&[1, 2, 2, 1], vec![0.2, 0.4, 0.6, 0.8]);
        let gray = normalize_intensity(thermal.view()).unwrap();

        assert_eq!(gray.dimensions(), (2, 2));
        assert_eq!(gray.as_raw(), &vec![0, 85, 170, 255]);
    }

    #[test]
    fn test_constant_map_is_all_zero() {
        let thermal = map(&[1, 4, 4, 1], vec![0.37; 16]);
        let gray = normalize_intensity(thermal.view()).unwrap();
        assert!(gray.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_non_finite_rejected() {
        let thermal = map(&[2, 2], vec![0.0, f32::NAN, 1.0, 0.5]);
        assert!(matches!(normalize_intensity(thermal.view()), Err(RenderError::NonFinite)));
    }

    proptest! {
        #[test]
        fn test_normalized_map_is_fixed_point(
            mut values in prop::collection::vec(0u8..=255, 14),
        ) {
            values.push(0);
            values.push(255);
            let thermal = map(&[4, 4], values.iter().map(|&v| v as f32).collect());

            let gray = normalize_intensity(thermal.view()).unwrap();
            prop_assert_eq!(gray.as_raw(), &values);
        }

        #[test]
        fn test_output_spans_full_range(values in prop::collection::vec(-1000.0f32..1000.0, 2..64)) {
            let len = values.len();
            let thermal = map(&[1, len], values.clone());
            let gray = normalize_intensity(thermal.view()).unwrap();

            let lo = gray.pixels().map(|p| p.0[0]).min().unwrap();
            let hi = gray.pixels().map(|p| p.0[0]).max().unwrap();
            let constant = values.iter().all(|&v| v == values[0]);
            prop_assert_eq!(lo, 0);
            prop_assert_eq!(hi, if constant { 0 } else { 255 });
        }
    }
}
