//! Heat map renderer

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use ndarray::ArrayViewD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::normalize_intensity;
use crate::palette::Palette;
use crate::RenderError;

/// Renderer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Palette for the false-color mapping
    pub palette: Palette,
}

/// Encoded heat map ready for transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

impl HeatmapImage {
    /// `data:<mime>;base64,<payload>` for direct embedding
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Turns a thermal map into a false-color PNG
#[derive(Debug, Clone, Default)]
pub struct ThermalRenderer {
    config: RenderConfig,
}

impl ThermalRenderer {
    /// Create a new renderer
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a thermal map of shape H×W, optionally wrapped in singleton axes
    pub fn render(&self, thermal: ArrayViewD<'_, f32>) -> Result<HeatmapImage, RenderError> {
        let intensity = normalize_intensity(thermal)?;
        let colored = self.config.palette.apply(&intensity);

        let mut buffer = Cursor::new(Vec::new());
        colored
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        let bytes = buffer.into_inner();

        debug!(
            "Rendered {}x{} heat map ({} PNG bytes)",
            colored.width(),
            colored.height(),
            bytes.len()
        );

        Ok(HeatmapImage {
            bytes,
            mime: "image/png",
            width: colored.width(),
            height: colored.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn decode(heatmap: &HeatmapImage) -> image::RgbImage {
        image::load_from_memory_with_format(&heatmap.bytes, ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    #[test]
    fn test_render_model_shaped_map() {
        let data: Vec<f32> = (0..64).map(|i| i as f32 / 63.0).collect();
        let thermal = ArrayD::from_shape_vec(IxDyn(&[1, 8, 8, 1]), data).unwrap();

        let heatmap = ThermalRenderer::default().render(thermal.view()).unwrap();
        assert_eq!((heatmap.width, heatmap.height), (8, 8));
        assert_eq!(heatmap.mime, "image/png");

        let decoded = decode(&heatmap);
        let lut = Palette::Inferno.lut();
        assert_eq!(*decoded.get_pixel(0, 0), lut[0]);
        assert_eq!(*decoded.get_pixel(7, 7), lut[255]);
    }

    #[test]
    fn test_constant_map_renders_darkest_color() {
        let thermal = ArrayD::from_elem(IxDyn(&[1, 4, 4, 1]), 0.0f32);
        let heatmap = ThermalRenderer::default().render(thermal.view()).unwrap();

        let darkest = Palette::Inferno.lut()[0];
        assert!(decode(&heatmap).pixels().all(|p| *p == darkest));
    }

    #[test]
    fn test_data_uri_prefix() {
        let thermal = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let uri = ThermalRenderer::default().render(thermal.view()).unwrap().to_data_uri();

        let payload = uri.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_palette_choice() {
        let thermal = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.0, 1.0]).unwrap();
        let renderer = ThermalRenderer::new(RenderConfig {
            palette: Palette::Magma,
        });
        let decoded = decode(&renderer.render(thermal.view()).unwrap());
        assert_eq!(*decoded.get_pixel(1, 0), Palette::Magma.lut()[255]);
    }

    #[test]
    fn test_bad_maps_are_errors() {
        let cube = ArrayD::from_elem(IxDyn(&[2, 2, 2]), 0.5f32);
        assert!(matches!(
            ThermalRenderer::default().render(cube.view()),
            Err(RenderError::Shape(_))
        ));

        let nan = ArrayD::from_elem(IxDyn(&[2, 2]), f32::NAN);
        assert!(matches!(
            ThermalRenderer::default().render(nan.view()),
            Err(RenderError::NonFinite)
        ));
    }
}
