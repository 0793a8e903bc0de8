//! Inference Engine - ONNX Runtime Integration
//!
//! Loads the footprint regression model once and runs it on single-row
//! feature frames. The artifact is expected to declare one `[N, 1]` input
//! per feature column, named after the column, and a `[N, >=2]` float output.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};
use parking_lot::Mutex;

use super::frame::{FeatureFrame, FeatureValue};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("columns are missing: {{{}}}", quote_list(.0))]
    MissingColumns(Vec<String>),

    #[error("column '{column}': {reason}")]
    InvalidCell { column: String, reason: String },

    #[error("model input '{name}' has unsupported type {kind}")]
    UnsupportedInput { name: String, kind: String },

    #[error("inference failed: {0}")]
    Runtime(String),

    #[error("model produced no output")]
    NoOutput,
}

impl From<ort::Error> for InferenceError {
    fn from(err: ort::Error) -> Self {
        InferenceError::Runtime(err.to_string())
    }
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// PREDICTOR TRAIT
// ============================================================================

/// Anything that turns a feature frame into one row of model outputs.
///
/// Implementations must be safe to call from many requests at once.
pub trait Predictor: Send + Sync {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>, InferenceError>;
}

// ============================================================================
// INPUT SCHEMA
// ============================================================================

/// Element type of a model input, restricted to what a frame cell can feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Float32,
    Float64,
    Int64,
    Int32,
    Text,
    Bool,
}

impl InputKind {
    fn from_element_type(ty: TensorElementType) -> Option<Self> {
        match ty {
            TensorElementType::Float32 => Some(InputKind::Float32),
            TensorElementType::Float64 => Some(InputKind::Float64),
            TensorElementType::Int64 => Some(InputKind::Int64),
            TensorElementType::Int32 => Some(InputKind::Int32),
            TensorElementType::String => Some(InputKind::Text),
            TensorElementType::Bool => Some(InputKind::Bool),
            _ => None,
        }
    }
}

/// Declared model input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub name: String,
    pub kind: InputKind,
}

/// A frame cell converted to the input's element type
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    F32(f32),
    F64(f64),
    I64(i64),
    I32(i32),
    Text(String),
    Bool(bool),
}

impl Cell {
    /// Convert a frame cell for an input of the given kind
    pub fn coerce(column: &str, kind: InputKind, value: &FeatureValue) -> Result<Self, InferenceError> {
        let invalid = |reason: String| InferenceError::InvalidCell {
            column: column.to_string(),
            reason,
        };

        match (kind, value) {
            (InputKind::Float32 | InputKind::Float64, FeatureValue::Text(s)) => {
                Err(invalid(format!("could not convert string to float: '{}'", s)))
            }
            (InputKind::Float32, value) => Ok(Cell::F32(as_float(value) as f32)),
            (InputKind::Float64, value) => Ok(Cell::F64(as_float(value))),

            (InputKind::Int64 | InputKind::Int32, FeatureValue::Number(n)) => {
                if n.fract() != 0.0 || !n.is_finite() {
                    return Err(invalid(format!("expected an integer, got {}", n)));
                }
                if kind == InputKind::Int64 {
                    // i64::MAX as f64 rounds up to 2^63, which is out of range
                    if *n >= i64::MIN as f64 && *n < i64::MAX as f64 {
                        Ok(Cell::I64(*n as i64))
                    } else {
                        Err(invalid(format!("{} does not fit in int64", n)))
                    }
                } else if *n >= i32::MIN as f64 && *n <= i32::MAX as f64 {
                    Ok(Cell::I32(*n as i32))
                } else {
                    Err(invalid(format!("{} does not fit in int32", n)))
                }
            }
            (InputKind::Int64, FeatureValue::Bool(b)) => Ok(Cell::I64(i64::from(*b))),
            (InputKind::Int32, FeatureValue::Bool(b)) => Ok(Cell::I32(i32::from(*b))),
            (InputKind::Int64 | InputKind::Int32, other) => {
                Err(invalid(format!("expected an integer, got {}", describe(other))))
            }

            (InputKind::Text, FeatureValue::Null) => {
                Err(invalid("expected a string, got null".to_string()))
            }
            (InputKind::Text, value) => Ok(Cell::Text(value.to_string())),

            (InputKind::Bool, FeatureValue::Bool(b)) => Ok(Cell::Bool(*b)),
            (InputKind::Bool, other) => {
                Err(invalid(format!("expected a boolean, got {}", describe(other))))
            }
        }
    }

    /// Wrap as a `[1, 1]` tensor
    fn into_value(self) -> Result<DynValue, InferenceError> {
        let value = match self {
            Cell::F32(v) => Tensor::from_array(Array2::from_elem((1, 1), v))?.into_dyn(),
            Cell::F64(v) => Tensor::from_array(Array2::from_elem((1, 1), v))?.into_dyn(),
            Cell::I64(v) => Tensor::from_array(Array2::from_elem((1, 1), v))?.into_dyn(),
            Cell::I32(v) => Tensor::from_array(Array2::from_elem((1, 1), v))?.into_dyn(),
            Cell::Bool(v) => Tensor::from_array(Array2::from_elem((1, 1), v))?.into_dyn(),
            Cell::Text(s) => {
                let array = Array2::from_elem((1, 1), s);
                Tensor::from_string_array(&array)?.into_dyn()
            }
        };
        Ok(value)
    }
}

fn as_float(value: &FeatureValue) -> f64 {
    match value {
        FeatureValue::Number(n) => *n,
        FeatureValue::Bool(b) => f64::from(u8::from(*b)),
        FeatureValue::Null | FeatureValue::Text(_) => f64::NAN,
    }
}

fn describe(value: &FeatureValue) -> String {
    match value {
        FeatureValue::Text(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

/// First row of a row-major output; rank <= 1 outputs are a single row
pub fn first_row(shape: &[usize], data: Vec<f64>) -> Vec<f64> {
    if shape.len() <= 1 {
        return data;
    }
    let width: usize = shape[1..].iter().product();
    data.into_iter().take(width).collect()
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

/// ONNX-backed predictor, immutable once loaded
pub struct OnnxPredictor {
    session: Mutex<Session>,
    inputs: Vec<InputSpec>,
    output_name: String,
    output_f64: bool,
}

impl OnnxPredictor {
    /// Load ONNX model from file
    pub fn load(model_path: &Path, inference_threads: Option<usize>) -> Result<Self, InferenceError> {
        tracing::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(InferenceError::ModelNotFound(model_path.to_path_buf()));
        }

        let mut builder = Session::builder()
            .map_err(|e| InferenceError::Load(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Load(format!("optimization level: {}", e)))?;

        if let Some(threads) = inference_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| InferenceError::Load(format!("intra threads: {}", e)))?;
        }

        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| InferenceError::Load(e.to_string()))?;

        let mut inputs = Vec::with_capacity(session.inputs.len());
        for input in &session.inputs {
            let kind = match &input.input_type {
                ValueType::Tensor { ty, .. } => InputKind::from_element_type(*ty),
                _ => None,
            };
            let kind = kind.ok_or_else(|| InferenceError::UnsupportedInput {
                name: input.name.clone(),
                kind: format!("{:?}", input.input_type),
            })?;
            inputs.push(InputSpec {
                name: input.name.clone(),
                kind,
            });
        }

        let output = session.outputs.first().ok_or(InferenceError::NoOutput)?;
        let output_f64 = matches!(
            output.output_type,
            ValueType::Tensor { ty: TensorElementType::Float64, .. }
        );
        let output_name = output.name.clone();

        tracing::info!(
            "ONNX model loaded: inputs=[{}], output='{}'",
            inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>().join(", "),
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            inputs,
            output_name,
            output_f64,
        })
    }

    /// Build the named input tensors for one frame
    fn prepare(&self, frame: &FeatureFrame) -> Result<Vec<(String, DynValue)>, InferenceError> {
        let values = frame.require(self.inputs.iter().map(|i| i.name.as_str()))?;

        self.inputs
            .iter()
            .zip(values)
            .map(|(spec, value)| {
                let cell = Cell::coerce(&spec.name, spec.kind, value)?;
                Ok((spec.name.clone(), cell.into_value()?))
            })
            .collect()
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>, InferenceError> {
        let start_time = std::time::Instant::now();
        let inputs = self.prepare(frame)?;

        let mut session = self.session.lock();
        let outputs = session.run(inputs)?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or(InferenceError::NoOutput)?;

        let (shape, data): (Vec<usize>, Vec<f64>) = if self.output_f64 {
            let view = output.try_extract_array::<f64>()?;
            (view.shape().to_vec(), view.iter().copied().collect())
        } else {
            let view = output.try_extract_array::<f32>()?;
            (view.shape().to_vec(), view.iter().map(|v| f64::from(*v)).collect())
        };

        tracing::debug!(
            "Inference done in {}us, output shape {:?}",
            start_time.elapsed().as_micros(),
            shape
        );

        Ok(first_row(&shape, data))
    }
}
