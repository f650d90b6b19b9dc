//! facebotd — Recognition-to-action decision loop.
//!
//! [`engine::DecisionCore`] runs one sense → match → feedback/actuate cycle
//! at a time until both stop controls are pressed.

pub mod engine;
