//! Dual-control stop signal.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Source of the stop request: both controls held at once.
pub trait StopSignal {
    fn both_controls_pressed(&mut self) -> bool;
}

impl<T: StopSignal + ?Sized> StopSignal for Box<T> {
    fn both_controls_pressed(&mut self) -> bool {
        (**self).both_controls_pressed()
    }
}

/// Two buttons wired to sysfs GPIO lines (`/sys/class/gpio/gpioN/value`).
pub struct GpioButtons {
    a: PathBuf,
    b: PathBuf,
}

impl GpioButtons {
    pub fn new(a: PathBuf, b: PathBuf) -> Self {
        Self { a, b }
    }

    fn is_pressed(path: &Path) -> bool {
        match std::fs::read_to_string(path) {
            Ok(v) => v.trim() == "1",
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "button read failed");
                false
            }
        }
    }
}

impl StopSignal for GpioButtons {
    fn both_controls_pressed(&mut self) -> bool {
        // Read both every poll, no short-circuit.
        let a = Self::is_pressed(&self.a);
        let b = Self::is_pressed(&self.b);
        a && b
    }
}

/// Replays a fixed sequence of poll results, then repeats `then`.
pub struct ScriptedButtons {
    script: VecDeque<bool>,
    then: bool,
}

impl ScriptedButtons {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: script.into_iter().collect(),
            then: false,
        }
    }

    /// Never pressed.
    pub fn released() -> Self {
        Self::new(std::iter::empty())
    }

    /// Pressed from poll `polls + 1` onward.
    pub fn pressed_after(polls: usize) -> Self {
        Self {
            script: std::iter::repeat(false).take(polls).collect(),
            then: true,
        }
    }
}

impl StopSignal for ScriptedButtons {
    fn both_controls_pressed(&mut self) -> bool {
        self.script.pop_front().unwrap_or(self.then)
    }
}
