//! Loaded model and its metadata

use std::path::{Path, PathBuf};

use preprocess::{InputShape, ResolvedShape};
use tracing::{error, info, warn};

use crate::backend::{ModelBackend, TractBackend};
use crate::labels::LabelVocabulary;

/// Read-only facts about the model, shared with every request
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Where the model was loaded from
    pub path: Option<PathBuf>,
    /// Whether a backend is resident
    pub loaded: bool,
    /// Input shape as the model declares it
    pub declared_shape: InputShape,
    /// Concrete shape used for preprocessing
    pub resolved_shape: ResolvedShape,
    /// Class names for the ripeness head
    pub labels: Option<LabelVocabulary>,
}

/// Model handle: the backend (if any) plus its metadata.
///
/// Built once at startup. A handle without a backend is valid and means
/// "not loaded"; the engine reports it instead of failing the process.
pub struct ModelHandle {
    backend: Option<Box<dyn ModelBackend>>,
    info: ModelInfo,
}

impl ModelHandle {
    /// Load an ONNX model and optional label vocabulary.
    ///
    /// Never fails: load errors are logged and produce an unloaded handle.
    pub fn load<P: AsRef<Path>>(model_path: P, labels_path: Option<&Path>) -> Self {
        let model_path = model_path.as_ref();
        let labels = labels_path.and_then(LabelVocabulary::load);

        if !model_path.exists() {
            warn!(
                "Model not found at '{}'. Prediction requests will be refused.",
                model_path.display()
            );
            return Self::not_loaded(Some(model_path.to_path_buf()), labels);
        }

        info!("Loading model from '{}'", model_path.display());
        match TractBackend::load(model_path) {
            Ok((backend, declared)) => {
                let handle = Self::from_backend(Box::new(backend), declared, labels);
                Self {
                    info: ModelInfo {
                        path: Some(model_path.to_path_buf()),
                        ..handle.info
                    },
                    backend: handle.backend,
                }
            }
            Err(e) => {
                error!("Failed to load model: {}", e);
                Self::not_loaded(Some(model_path.to_path_buf()), labels)
            }
        }
    }

    /// Wrap an already constructed backend
    pub fn from_backend(
        backend: Box<dyn ModelBackend>,
        declared_shape: InputShape,
        labels: Option<LabelVocabulary>,
    ) -> Self {
        let resolved_shape = declared_shape.resolve();
        info!(
            "Model ready on {} backend. Input: {} resolved to {}x{}x{}",
            backend.name(),
            declared_shape,
            resolved_shape.height,
            resolved_shape.width,
            resolved_shape.channels
        );
        Self {
            backend: Some(backend),
            info: ModelInfo {
                path: None,
                loaded: true,
                declared_shape,
                resolved_shape,
                labels,
            },
        }
    }

    /// Handle with no model resident
    pub fn not_loaded(path: Option<PathBuf>, labels: Option<LabelVocabulary>) -> Self {
        let declared_shape = InputShape::unknown();
        Self {
            backend: None,
            info: ModelInfo {
                path,
                loaded: false,
                resolved_shape: declared_shape.resolve(),
                declared_shape,
                labels,
            },
        }
    }

    /// Whether a model is resident
    pub fn is_loaded(&self) -> bool {
        self.backend.is_some()
    }

    /// Model metadata
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Split into backend and metadata
    pub(crate) fn into_parts(self) -> (Option<Box<dyn ModelBackend>>, ModelInfo) {
        (self.backend, self.info)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("info", &self.info)
            .finish()
    }
}
