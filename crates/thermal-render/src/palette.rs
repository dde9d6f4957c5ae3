//! Perceptual false-color palettes

use colorous::Gradient;
use image::{GrayImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Palette used to color intensity, dark for low and bright for high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Inferno,
    Magma,
}

impl Palette {
    fn gradient(self) -> Gradient {
        match self {
            Palette::Inferno => colorous::INFERNO,
            Palette::Magma => colorous::MAGMA,
        }
    }

    /// 256-entry lookup table sampled evenly from the gradient
    pub fn lut(self) -> [Rgb<u8>; 256] {
        let gradient = self.gradient();
        let mut table = [Rgb([0, 0, 0]); 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let color = gradient.eval_continuous(i as f64 / 255.0);
            *entry = Rgb([color.r, color.g, color.b]);
        }
        table
    }

    /// Color every pixel of an intensity image
    pub fn apply(self, intensity: &GrayImage) -> RgbImage {
        let table = self.lut();
        RgbImage::from_fn(intensity.width(), intensity.height(), |x, y| {
            table[intensity.get_pixel(x, y).0[0] as usize]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn luma(c: Rgb<u8>) -> f64 {
        0.2126 * c.0[0] as f64 + 0.7152 * c.0[1] as f64 + 0.0722 * c.0[2] as f64
    }

    #[test]
    fn test_lut_endpoints_match_gradient() {
        for palette in [Palette::Inferno, Palette::Magma] {
            let table = palette.lut();
            let low = palette.gradient().eval_continuous(0.0);
            let high = palette.gradient().eval_continuous(1.0);
            assert_eq!(table[0].0, [low.r, low.g, low.b]);
            assert_eq!(table[255].0, [high.r, high.g, high.b]);
        }
    }

    #[test]
    fn test_inferno_gets_brighter() {
        let table = Palette::Inferno.lut();
        let samples: Vec<f64> = (0..=255).step_by(15).map(|i| luma(table[i])).collect();
        assert!(samples.windows(2).all(|w| w[1] >= w[0]), "{samples:?}");
        assert!(luma(table[0]) < 10.0);
        assert!(luma(table[255]) > 200.0);
    }

    #[test]
    fn test_apply_maps_each_pixel() {
        let gray = GrayImage::from_raw(3, 1, vec![0, 128, 255]).unwrap();
        let table = Palette::Inferno.lut();
        let colored = Palette::Inferno.apply(&gray);
        assert_eq!(*colored.get_pixel(0, 0), table[0]);
        assert_eq!(*colored.get_pixel(1, 0), table[128]);
        assert_eq!(*colored.get_pixel(2, 0), table[255]);
    }

    #[test]
    fn test_palettes_differ() {
        assert_ne!(Palette::Inferno.lut()[128], Palette::Magma.lut()[128]);
    }

    #[test]
    fn test_default_is_inferno() {
        assert_eq!(Palette::default(), Palette::Inferno);
    }
}
