//! Candle-backed implementations of the two model interfaces.
//!
//! Weights, configs and tokenizers come from the Hugging Face hub and are
//! cached locally after the first download.

mod cross_encoder;
mod hub;
mod t5;

pub use cross_encoder::{CandleCrossEncoder, CrossEncoderLoader};
pub use hub::{fetch, ModelFiles};
pub use t5::{T5Loader, T5Summarizer};
