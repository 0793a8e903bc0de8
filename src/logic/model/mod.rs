//! Model Module - footprint inference
//!
//! Frame construction is kept apart from the runtime so the request path
//! can be tested against any `Predictor`.

pub mod frame;
pub mod inference;

// Re-export common types
pub use frame::{FeatureFrame, FeatureValue, FrameError};
pub use inference::{InferenceError, OnnxPredictor, Predictor};
