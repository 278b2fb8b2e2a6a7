//! Interactive visualization module for driving the engine in real time

mod viewer;

pub use viewer::{InteractiveViewer, ViewerConfig, ViewerError};
