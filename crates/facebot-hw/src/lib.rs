//! facebot-hw — Device capabilities for the recognition loop.
//!
//! Defines the sensing, feedback, actuation and stop-signal traits the
//! daemon drives, plus simulated devices for running off-robot.

pub mod buttons;
pub mod error;
pub mod frame;
pub mod loader;
pub mod matrix;
pub mod motor;
pub mod sensing;

pub use buttons::{GpioButtons, ScriptedButtons, StopSignal};
pub use error::SinkError;
pub use frame::{Frame, Region};
pub use loader::{read_encoding_file, FileEncodingLoader};
pub use matrix::{FeedbackSink, Glyph, LedMatrix, Shown};
pub use motor::{ActuationSink, DifferentialDrive};
pub use sensing::{SensingSource, SensorError, SimulatedCamera};
