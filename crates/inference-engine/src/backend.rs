//! Model backends

use std::path::Path;

use preprocess::{InputShape, InputTensor, ResolvedShape};
use tracing::{debug, info, warn};
use tract_onnx::prelude::{
    tvec, DatumExt, Framework, Graph, InferenceModel, InferenceModelExt, IntoTensor, SimplePlan, Tensor,
    TypedFact, TypedOp,
};
use tract_onnx::tract_hir::internal::DimLike;

use crate::InferenceError;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// One output tensor, flattened to f32
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl RawOutput {
    /// Create a new raw output
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// Executes the model for one input.
///
/// Implementations are owned by the inference worker and are never called
/// concurrently.
pub trait ModelBackend: Send + 'static {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Run the model, returning outputs in model order
    fn run(&mut self, input: &InputTensor) -> Result<Vec<RawOutput>, InferenceError>;
}

/// ONNX backend on tract (CPU only)
pub struct TractBackend {
    plan: RunnableModel,
    input_shape: [usize; 4],
}

impl std::fmt::Debug for TractBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TractBackend")
            .field("input_shape", &self.input_shape)
            .finish()
    }
}

impl TractBackend {
    /// Load an ONNX graph and pin it to a concrete `[1, H, W, C]` input.
    ///
    /// Returns the backend together with the shape the graph declared.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Self, InputShape), InferenceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InferenceError::ModelLoadError(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let model = tract_onnx::onnx().model_for_path(path).map_err(|e| {
            InferenceError::ModelLoadError(format!(
                "failed to parse ONNX graph from {}: {e}",
                path.display()
            ))
        })?;

        let declared = declared_input_shape(&model);
        let resolved = declared.resolve();
        for warning in &resolved.warnings {
            warn!("{}", warning);
        }

        let plan = build_plan(model, &resolved)?;
        info!(
            "Loaded ONNX model {} (declared {}, running {:?})",
            path.display(),
            declared,
            resolved.batched()
        );

        Ok((
            Self {
                plan,
                input_shape: resolved.batched(),
            },
            declared,
        ))
    }
}

impl ModelBackend for TractBackend {
    fn name(&self) -> &str {
        "tract-onnx"
    }

    fn run(&mut self, input: &InputTensor) -> Result<Vec<RawOutput>, InferenceError> {
        let actual = input.batched_shape();
        if actual != self.input_shape {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{:?}", self.input_shape),
                actual: format!("{:?}", actual),
            });
        }

        let tensor = Tensor::from_shape(&actual, &input.to_vec())
            .map_err(|e| InferenceError::InferenceFailed(format!("failed to build input tensor: {e}")))?;

        let outputs = self
            .plan
            .run(tvec![tensor.into()])
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        outputs
            .into_iter()
            .map(|value| {
                let tensor = value.into_tensor();
                let floats = tensor
                    .cast_to::<f32>()
                    .map_err(|e| InferenceError::InferenceFailed(format!("output not castable to f32: {e}")))?;
                let data = floats
                    .as_slice::<f32>()
                    .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?
                    .to_vec();
                Ok(RawOutput::new(tensor.shape().to_vec(), data))
            })
            .collect()
    }
}

/// Read the first input's declared extents, `None` for symbolic axes
fn declared_input_shape(model: &InferenceModel) -> InputShape {
    let typed = match model.clone().into_typed() {
        Ok(typed) => typed,
        Err(e) => {
            debug!("Could not type model to read input shape: {e}");
            return InputShape::unknown();
        }
    };
    match typed.input_fact(0) {
        Ok(fact) => {
            let dims: Vec<Option<usize>> = fact.shape.iter().map(|d| d.to_usize().ok()).collect();
            InputShape::from_dims(&dims)
        }
        Err(e) => {
            debug!("Model has no readable input fact: {e}");
            InputShape::unknown()
        }
    }
}

/// Optimize the pinned graph, falling back to a decluttered plan
fn build_plan(model: InferenceModel, shape: &ResolvedShape) -> Result<RunnableModel, InferenceError> {
    let pinned = model
        .with_input_fact(0, f32::fact(shape.batched()).into())
        .map_err(|e| InferenceError::ModelLoadError(format!("unable to pin input shape: {e}")))?;

    match pinned.clone().into_optimized().and_then(|m| m.into_runnable()) {
        Ok(plan) => Ok(plan),
        Err(opt_err) => {
            warn!("Optimized load failed ({opt_err}); falling back to decluttered graph");
            pinned
                .into_typed()
                .and_then(|m| m.into_decluttered())
                .and_then(|m| m.into_runnable())
                .map_err(|e| {
                    InferenceError::ModelLoadError(format!(
                        "decluttered fallback failed after optimize error ({opt_err}): {e}"
                    ))
                })
        }
    }
}
