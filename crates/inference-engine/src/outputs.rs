//! Named model outputs

use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::backend::RawOutput;
use crate::InferenceError;

/// The three heads of the ripeness model
#[derive(Debug, Clone, Default)]
pub struct ModelOutputs {
    /// Spatial heat map, e.g. `(1, H, W, 1)`
    pub thermal: Option<ArrayD<f32>>,
    /// Ripeness probability vector or single sigmoid
    pub ripeness: Option<ArrayD<f32>>,
    /// Species guard score; kept for shape compatibility only
    pub guard: Option<ArrayD<f32>>,
}

impl ModelOutputs {
    /// Split raw outputs into named heads.
    ///
    /// A single output is the ripeness head. Otherwise outputs of rank 3 or
    /// more are heat map candidates (the largest wins) and lower-rank outputs
    /// are classification heads in model order: ripeness, then guard.
    pub fn from_raw(raw: Vec<RawOutput>) -> Result<Self, InferenceError> {
        if raw.len() == 1 {
            let only = raw.into_iter().next().map(to_array).transpose()?;
            return Ok(Self {
                ripeness: only,
                ..Default::default()
            });
        }

        let mut thermal: Option<(usize, RawOutput)> = None;
        let mut heads = Vec::new();

        for (index, output) in raw.into_iter().enumerate() {
            if output.rank() >= 3 {
                let larger = thermal
                    .as_ref()
                    .map_or(true, |(_, current)| output.data.len() > current.data.len());
                if larger {
                    thermal = Some((index, output));
                }
            } else {
                heads.push((index, output));
            }
        }

        if let Some((index, output)) = &thermal {
            debug!("Thermal output: index={} shape={:?}", index, output.shape);
        }

        let mut heads = heads.into_iter();
        let ripeness = heads.next().map(|(index, output)| {
            debug!("Ripeness output: index={} shape={:?}", index, output.shape);
            output
        });
        let guard = heads.next().map(|(index, output)| {
            debug!("Guard output: index={} shape={:?}", index, output.shape);
            output
        });

        Ok(Self {
            thermal: thermal.map(|(_, output)| to_array(output)).transpose()?,
            ripeness: ripeness.map(to_array).transpose()?,
            guard: guard.map(to_array).transpose()?,
        })
    }

    /// Ripeness values flattened in logical order
    pub fn ripeness_values(&self) -> Vec<f32> {
        self.ripeness
            .as_ref()
            .map(|array| array.iter().copied().collect())
            .unwrap_or_default()
    }
}

fn to_array(output: RawOutput) -> Result<ArrayD<f32>, InferenceError> {
    ArrayD::from_shape_vec(IxDyn(&output.shape), output.data).map_err(|e| {
        InferenceError::InferenceFailed(format!("output shape {:?} mismatch: {e}", output.shape))
    })
}
