//! RGB to HSV conversion on the 8-bit scales used by the gate
//!
//! Hue is halved to fit a byte (0-180), saturation and value span 0-255.

/// HSV triple on 8-bit scales
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    /// Hue, 0-180 (degrees / 2)
    pub hue: u8,
    /// Saturation, 0-255
    pub saturation: u8,
    /// Value (brightness), 0-255
    pub value: u8,
}

impl Hsv {
    /// Fully desaturated (gray/white) or black
    pub fn is_achromatic(&self) -> bool {
        self.saturation == 0 || self.value == 0
    }
}

/// Convert an RGB pixel to 8-bit HSV
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f32;

    if max == 0 {
        return Hsv {
            hue: 0,
            saturation: 0,
            value: 0,
        };
    }

    let saturation = (255.0 * delta / max as f32).round() as u8;
    if delta == 0.0 {
        return Hsv {
            hue: 0,
            saturation,
            value: max,
        };
    }

    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let degrees = if max == r {
        60.0 * (gf - bf) / delta
    } else if max == g {
        60.0 * (bf - rf) / delta + 120.0
    } else {
        60.0 * (rf - gf) / delta + 240.0
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };

    Hsv {
        hue: (degrees / 2.0).round().min(180.0) as u8,
        saturation,
        value: max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_hues() {
        assert_eq!(rgb_to_hsv(255, 0, 0).hue, 0);
        assert_eq!(rgb_to_hsv(255, 255, 0).hue, 30);
        assert_eq!(rgb_to_hsv(0, 255, 0).hue, 60);
        assert_eq!(rgb_to_hsv(0, 255, 255).hue, 90);
        assert_eq!(rgb_to_hsv(0, 0, 255).hue, 120);
        assert_eq!(rgb_to_hsv(255, 0, 255).hue, 150);
    }

    #[test]
    fn test_orange_hue() {
        // #FF8000 sits at 30 degrees
        assert_eq!(rgb_to_hsv(255, 128, 0).hue, 15);
    }

    #[test]
    fn test_saturation_and_value() {
        let hsv = rgb_to_hsv(200, 100, 100);
        assert_eq!(hsv.value, 200);
        assert_eq!(hsv.saturation, 128);
    }

    #[test]
    fn test_achromatic() {
        assert!(rgb_to_hsv(0, 0, 0).is_achromatic());
        assert!(rgb_to_hsv(255, 255, 255).is_achromatic());
        assert!(rgb_to_hsv(128, 128, 128).is_achromatic());
        assert!(!rgb_to_hsv(128, 129, 128).is_achromatic());
    }
}
