// lib.rs
//
// mockup-compositor: place artwork into a product mockup.
//
// A layered (PSD) mockup receives the artwork inside the bounds of its first
// visible layer; anything else gets it centered over 70% of the canvas. The
// result is a flattened JPEG plus the method that produced it.

pub mod config;
pub mod engine;
pub mod error;
pub mod ops;
pub mod protocol;

pub use config::ComposeConfig;
pub use engine::{Composition, Dispatcher};
pub use error::{ErrorCategory, MockupError, Result};
pub use ops::{JpegOutput, Method, Region};
pub use protocol::{handle_request, process_request, ComposeRequest, ComposeResponse};
