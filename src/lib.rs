// Image handler stack synthesizer library

pub mod assembler;
pub mod config;
pub mod constants;
pub mod error;
pub mod image_handler;
pub mod logging;
pub mod preview;
pub mod stack;
pub mod template;

pub use error::{Result, SynthError};
