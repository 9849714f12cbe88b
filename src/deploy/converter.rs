//! Converter capability interface and the model-kind dispatch table.

use crate::errors::{ForefrontError, Result};
use ndarray::ArrayD;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Tensorflow,
    Pytorch,
    Sklearn,
    Custom,
}

impl ModelKind {
    /// Extension crate that provides the converter for this kind.
    pub fn extension_package(self) -> &'static str {
        match self {
            ModelKind::Tensorflow => "forefront-tensorflow",
            ModelKind::Pytorch => "forefront-pytorch",
            ModelKind::Sklearn => "forefront-sklearn",
            ModelKind::Custom => "forefront",
        }
    }

    /// Best-effort inference from a runtime type name.
    ///
    /// Case-insensitive substring match. This is a fallback for models
    /// that were not tagged explicitly; callers should prefer passing the
    /// kind when they know it.
    pub fn infer_from_type_name(type_name: &str) -> Option<Self> {
        let name = type_name.to_lowercase();
        if name.contains("tensorflow") || name.contains("tf") {
            Some(ModelKind::Tensorflow)
        } else if name.contains("torch") {
            Some(ModelKind::Pytorch)
        } else if name.contains("sklearn") {
            Some(ModelKind::Sklearn)
        } else {
            None
        }
    }
}

impl FromStr for ModelKind {
    type Err = ForefrontError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tensorflow" | "keras" => Ok(ModelKind::Tensorflow),
            "pytorch" | "torch" => Ok(ModelKind::Pytorch),
            "sklearn" | "scikit-learn" => Ok(ModelKind::Sklearn),
            "custom" => Ok(ModelKind::Custom),
            other => Err(ForefrontError::Config(format!(
                "Unknown model type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Tensorflow => "tensorflow",
            ModelKind::Pytorch => "pytorch",
            ModelKind::Sklearn => "sklearn",
            ModelKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// An in-memory model object.
///
/// Object safe so heterogeneous models can flow through the dispatcher:
/// `type_name` feeds the best-effort kind inference and `portable_bytes`
/// backs the custom deployment path.
pub trait ModelArtifact {
    /// Runtime type name, e.g. `tf.keras.Sequential`.
    fn type_name(&self) -> &str;

    /// Generic serialization of the model for the custom path.
    fn portable_bytes(&self) -> Result<Vec<u8>>;
}

/// Inputs a converter may need beyond the model itself.
#[derive(Debug, Default, Clone)]
pub struct ConvertOptions {
    /// Input tensor shape for shape-inferring frameworks (sklearn).
    pub input_shape: Option<Vec<Option<u64>>>,
    /// Sample input for trace-based frameworks (pytorch).
    pub sample_input: Option<ArrayD<f32>>,
}

/// Converts a framework-native model into an interchange-format artifact.
///
/// One method: model in, artifact file out at `output`.
pub trait Converter: fmt::Debug {
    fn convert(
        &self,
        model: &dyn ModelArtifact,
        options: &ConvertOptions,
        output: &Path,
    ) -> Result<()>;
}

/// Converters registered per model kind.
///
/// A kind without a registration reads as "extension not installed" and
/// surfaces as a dependency error naming the missing crate.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<ModelKind, Box<dyn Converter + Send + Sync>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ModelKind, converter: Box<dyn Converter + Send + Sync>) {
        self.converters.insert(kind, converter);
    }

    pub fn contains(&self, kind: ModelKind) -> bool {
        self.converters.contains_key(&kind)
    }

    pub fn get(&self, kind: ModelKind) -> Result<&(dyn Converter + Send + Sync)> {
        self.converters
            .get(&kind)
            .map(|c| c.as_ref())
            .ok_or_else(|| ForefrontError::Dependency {
                package: kind.extension_package().to_string(),
            })
    }
}
