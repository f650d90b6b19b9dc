//! Actuation capability and a differential-drive motor model.

use crate::error::SinkError;
use facebot_core::Action;

/// Performs robot movements.
pub trait ActuationSink {
    /// Start `action`; [`Action::Stop`] halts all motors.
    fn perform(&mut self, action: Action) -> Result<(), SinkError>;
}

/// Two-wheel drive with PWM duty per wheel (0..=1023).
pub struct DifferentialDrive {
    forward_speed: u16,
    turn_speed: u16,
    duty: (u16, u16),
}

impl DifferentialDrive {
    pub fn new(forward_speed: u16, turn_speed: u16) -> Self {
        Self {
            forward_speed,
            turn_speed,
            duty: (0, 0),
        }
    }

    /// (left, right) duty for `action`. Turning drives only the outer wheel.
    pub fn duty_for(&self, action: Action) -> (u16, u16) {
        match action {
            Action::Forward => (self.forward_speed, self.forward_speed),
            Action::TurnLeft => (0, self.turn_speed),
            Action::TurnRight => (self.turn_speed, 0),
            Action::Stop => (0, 0),
        }
    }

    /// Current (left, right) duty.
    pub fn duty(&self) -> (u16, u16) {
        self.duty
    }
}

impl ActuationSink for DifferentialDrive {
    fn perform(&mut self, action: Action) -> Result<(), SinkError> {
        let (left, right) = self.duty_for(action);
        self.duty = (left, right);
        tracing::info!(action = %action, left, right, "motors");
        Ok(())
    }
}
