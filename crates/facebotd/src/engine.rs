use facebot_core::{
    Action, Config, DigestMatcher, EncodingError, IdentityRegistry, MatchResult, Matcher,
};
use facebot_hw::{ActuationSink, FeedbackSink, SensingSource, SensorError, SinkError, StopSignal};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Failure while turning a frame into a probe encoding. Never ends the run.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("sensing source unavailable: {0}")]
    SourceUnavailable(#[from] SensorError),
    #[error("unusable encoding: {0}")]
    Encoding(#[from] EncodingError),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("startup feedback failed: {0}")]
    Startup(#[source] SinkError),
    #[error("unhandled error in cycle {cycle}: {source}")]
    UnhandledCycle {
        cycle: u64,
        #[source]
        source: SinkError,
    },
}

/// Per-run constants the cycle consults.
pub struct CycleSettings {
    pub threshold: f32,
    pub cycle_delay: Duration,
    pub action_duration: Duration,
    digits: HashMap<String, u8>,
    actions: HashMap<String, Action>,
}

impl CycleSettings {
    /// Snapshot the name → digit/action tables. A name listed twice keeps
    /// its first entry, as the registry does.
    pub fn from_config(config: &Config) -> Self {
        let mut digits = HashMap::new();
        let mut actions = HashMap::new();
        for identity in &config.identities {
            if digits.contains_key(&identity.name) {
                continue;
            }
            digits.insert(identity.name.clone(), identity.digit.unwrap_or(0));
            actions.insert(identity.name.clone(), identity.action.unwrap_or_default());
        }

        Self {
            threshold: config.threshold,
            cycle_delay: config.cycle_delay(),
            action_duration: config.action_duration(),
            digits,
            actions,
        }
    }

    pub fn digit_for(&self, name: &str) -> u8 {
        self.digits.get(name).copied().unwrap_or(0)
    }

    pub fn action_for(&self, name: &str) -> Action {
        self.actions.get(name).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

/// What one cycle decided.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Recognized {
        identity: String,
        score: f32,
        digit: u8,
        action: Action,
    },
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub recognized: u64,
    pub unknown: u64,
}

/// Sense → match → feedback/actuate loop.
///
/// Owns everything a cycle touches: the read-only registry, the settings and
/// the four device capabilities. Starts RUNNING; STOPPED is terminal.
pub struct DecisionCore<S, F, A, B> {
    registry: IdentityRegistry,
    settings: CycleSettings,
    matcher: Box<dyn Matcher>,
    sensor: S,
    feedback: F,
    actuator: A,
    stop: B,
    state: RunState,
    summary: RunSummary,
}

impl<S, F, A, B> DecisionCore<S, F, A, B>
where
    S: SensingSource,
    F: FeedbackSink,
    A: ActuationSink,
    B: StopSignal,
{
    pub fn new(
        registry: IdentityRegistry,
        settings: CycleSettings,
        sensor: S,
        feedback: F,
        actuator: A,
        stop: B,
    ) -> Self {
        Self {
            registry,
            settings,
            matcher: Box::new(DigestMatcher),
            sensor,
            feedback,
            actuator,
            stop,
            state: RunState::Running,
            summary: RunSummary::default(),
        }
    }

    /// Replace the default digest matcher.
    pub fn with_matcher(mut self, matcher: Box<dyn Matcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Run cycles until both stop controls are pressed at a cycle boundary.
    ///
    /// An error escaping a cycle shows the error symbol once, clears the
    /// display and ends the run.
    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        if self.state == RunState::Stopped {
            return Ok(self.summary);
        }

        tracing::info!(
            identities = self.registry.len(),
            threshold = self.settings.threshold,
            "starting recognition loop"
        );

        if let Err(e) = self.feedback.show_startup() {
            return Err(self.abort(EngineError::Startup(e)));
        }

        while self.state == RunState::Running {
            if self.stop.both_controls_pressed() {
                tracing::info!("stop requested");
                self.state = RunState::Stopped;
                break;
            }

            let cycle = self.summary.cycles + 1;
            match self.cycle() {
                Ok(CycleOutcome::Recognized { .. }) => self.summary.recognized += 1,
                Ok(CycleOutcome::Unknown) => self.summary.unknown += 1,
                Err(source) => {
                    return Err(self.abort(EngineError::UnhandledCycle { cycle, source }));
                }
            }
            self.summary.cycles = cycle;

            sleep(self.settings.cycle_delay);
        }

        if let Err(e) = self.feedback.clear() {
            tracing::warn!(error = %e, "failed to clear display on shutdown");
        }
        tracing::info!(
            cycles = self.summary.cycles,
            recognized = self.summary.recognized,
            unknown = self.summary.unknown,
            "recognition loop stopped"
        );
        Ok(self.summary)
    }

    /// One full cycle. Sensing and matching failures degrade to "unknown";
    /// only feedback or actuation failures escape.
    pub fn cycle(&mut self) -> Result<CycleOutcome, SinkError> {
        let result = self.sense_and_match();

        match result {
            MatchResult {
                matched: true,
                identity: Some(identity),
                score,
            } => {
                let digit = self.settings.digit_for(&identity);
                let action = self.settings.action_for(&identity);

                self.feedback.show_digit(digit)?;
                self.actuate(action)?;

                tracing::info!(identity = %identity, score, digit, action = %action, "recognized");
                Ok(CycleOutcome::Recognized {
                    identity,
                    score,
                    digit,
                    action,
                })
            }
            _ => {
                self.feedback.show_unknown()?;
                tracing::info!("no face recognized");
                Ok(CycleOutcome::Unknown)
            }
        }
    }

    fn sense_and_match(&mut self) -> MatchResult {
        match self.try_match() {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "detection failed; treating as no face");
                MatchResult::no_match()
            }
        }
    }

    /// Capture a frame, encode its first face region, match it.
    fn try_match(&mut self) -> Result<MatchResult, DetectError> {
        let Some(frame) = self.sensor.capture_frame()? else {
            tracing::debug!("no frame available");
            return Ok(MatchResult::no_match());
        };

        let regions = self.sensor.detect_regions(&frame)?;
        let Some(region) = regions.first() else {
            tracing::debug!(seq = frame.sequence, "no face in frame");
            return Ok(MatchResult::no_match());
        };
        if regions.len() > 1 {
            tracing::debug!(faces = regions.len(), "multiple faces; using the first");
        }

        let Some(probe) = self.sensor.encode(&frame, region)? else {
            tracing::debug!(seq = frame.sequence, "face region yielded no encoding");
            return Ok(MatchResult::no_match());
        };

        Ok(self
            .matcher
            .compare(&probe, &self.registry, self.settings.threshold)?)
    }

    /// Perform `action`, hold it, then stop the motors.
    fn actuate(&mut self, action: Action) -> Result<(), SinkError> {
        self.actuator.perform(action)?;
        sleep(self.settings.action_duration);
        self.actuator.perform(Action::Stop)
    }

    /// Terminal failure: error symbol once, motors stopped, display cleared.
    fn abort(&mut self, err: EngineError) -> EngineError {
        self.state = RunState::Stopped;
        tracing::error!(error = %err, "recognition loop aborted");

        if let Err(e) = self.feedback.show_error() {
            tracing::warn!(error = %e, "failed to show error symbol");
        }
        if let Err(e) = self.actuator.perform(Action::Stop) {
            tracing::warn!(error = %e, "failed to stop motors");
        }
        if let Err(e) = self.feedback.clear() {
            tracing::warn!(error = %e, "failed to clear display");
        }
        err
    }
}

fn sleep(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facebot_core::config::IdentityConfig;
    use facebot_core::{protect, Encoding};
    use facebot_hw::{Frame, Region, ScriptedButtons};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Shown {
        Digit(u8),
        Unknown,
        Success,
        Failure,
        Error,
        Startup,
        Clear,
    }

    #[derive(Default)]
    struct RecordingFeedback {
        shown: Vec<Shown>,
        fail_digits: bool,
    }

    impl RecordingFeedback {
        fn push(&mut self, s: Shown) -> Result<(), SinkError> {
            self.shown.push(s);
            Ok(())
        }
    }

    impl FeedbackSink for RecordingFeedback {
        fn show_digit(&mut self, digit: u8) -> Result<(), SinkError> {
            if self.fail_digits {
                return Err(SinkError::Fault("matrix unplugged".into()));
            }
            self.push(Shown::Digit(digit))
        }
        fn show_unknown(&mut self) -> Result<(), SinkError> {
            self.push(Shown::Unknown)
        }
        fn show_success(&mut self) -> Result<(), SinkError> {
            self.push(Shown::Success)
        }
        fn show_failure(&mut self) -> Result<(), SinkError> {
            self.push(Shown::Failure)
        }
        fn show_error(&mut self) -> Result<(), SinkError> {
            self.push(Shown::Error)
        }
        fn show_startup(&mut self) -> Result<(), SinkError> {
            self.push(Shown::Startup)
        }
        fn clear(&mut self) -> Result<(), SinkError> {
            self.push(Shown::Clear)
        }
    }

    #[derive(Default)]
    struct RecordingMotors {
        actions: Vec<Action>,
        fail: bool,
    }

    impl ActuationSink for RecordingMotors {
        fn perform(&mut self, action: Action) -> Result<(), SinkError> {
            if self.fail && action != Action::Stop {
                return Err(SinkError::Fault("motor stalled".into()));
            }
            self.actions.push(action);
            Ok(())
        }
    }

    enum Capture {
        Frame,
        NoFrame,
        Fail,
    }

    struct FakeSensor {
        capture: Capture,
        regions: Vec<Region>,
        probe: Option<Encoding>,
        encoded: Vec<Region>,
    }

    impl FakeSensor {
        fn seeing(probe: Encoding) -> Self {
            Self {
                capture: Capture::Frame,
                regions: vec![Region::new(50, 50, 100, 100)],
                probe: Some(probe),
                encoded: Vec::new(),
            }
        }
    }

    impl SensingSource for FakeSensor {
        fn capture_frame(&mut self) -> Result<Option<Frame>, SensorError> {
            match self.capture {
                Capture::Frame => Ok(Some(Frame {
                    data: vec![0; 16],
                    width: 4,
                    height: 4,
                    timestamp: std::time::Instant::now(),
                    sequence: 1,
                })),
                Capture::NoFrame => Ok(None),
                Capture::Fail => Err(SensorError::CaptureFailed("lens cap on".into())),
            }
        }

        fn detect_regions(&mut self, _frame: &Frame) -> Result<Vec<Region>, SensorError> {
            Ok(self.regions.clone())
        }

        fn encode(&mut self, _frame: &Frame, region: &Region) -> Result<Option<Encoding>, SensorError> {
            self.encoded.push(*region);
            Ok(self.probe.clone())
        }
    }

    fn alice() -> Encoding {
        Encoding::new((0..128).map(|i| i as f64 / 128.0).collect())
    }

    fn stranger() -> Encoding {
        Encoding::new((0..128).map(|i| 1.0 - i as f64 / 256.0).collect())
    }

    fn settings() -> CycleSettings {
        let mut config = Config::default();
        config.cycle_delay_ms = 0;
        config.action_duration_ms = 0;
        config.identities = vec![IdentityConfig {
            name: "Alice".into(),
            source: PathBuf::from("alice.json"),
            digit: Some(1),
            action: Some(Action::Forward),
        }];
        CycleSettings::from_config(&config)
    }

    fn alice_registry() -> IdentityRegistry {
        IdentityRegistry::from_references(vec![("Alice".to_string(), protect(&alice()).unwrap())])
    }

    type TestCore = DecisionCore<FakeSensor, RecordingFeedback, RecordingMotors, ScriptedButtons>;

    fn core(sensor: FakeSensor, stop: ScriptedButtons) -> TestCore {
        DecisionCore::new(
            alice_registry(),
            settings(),
            sensor,
            RecordingFeedback::default(),
            RecordingMotors::default(),
            stop,
        )
    }

    #[test]
    fn test_known_face_shows_digit_and_acts() {
        let mut core = core(FakeSensor::seeing(alice()), ScriptedButtons::released());
        let outcome = core.cycle().unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::Recognized {
                identity: "Alice".into(),
                score: 1.0,
                digit: 1,
                action: Action::Forward,
            }
        );
        assert_eq!(core.feedback().shown, vec![Shown::Digit(1)]);
        assert_eq!(core.actuator().actions, vec![Action::Forward, Action::Stop]);
    }

    #[test]
    fn test_unknown_face_shows_question_mark() {
        let mut core = core(FakeSensor::seeing(stranger()), ScriptedButtons::released());
        assert_eq!(core.cycle().unwrap(), CycleOutcome::Unknown);
        assert_eq!(core.feedback().shown, vec![Shown::Unknown]);
        assert!(core.actuator().actions.is_empty());
    }

    #[test]
    fn test_no_regions_is_no_detection() {
        let mut sensor = FakeSensor::seeing(alice());
        sensor.regions.clear();
        let mut core = core(sensor, ScriptedButtons::released());

        assert_eq!(core.cycle().unwrap(), CycleOutcome::Unknown);
        assert_eq!(core.feedback().shown, vec![Shown::Unknown]);
        assert!(core.actuator().actions.is_empty());
    }

    #[test]
    fn test_no_frame_is_no_detection() {
        let mut sensor = FakeSensor::seeing(alice());
        sensor.capture = Capture::NoFrame;
        let mut core = core(sensor, ScriptedButtons::released());
        assert_eq!(core.cycle().unwrap(), CycleOutcome::Unknown);
    }

    #[test]
    fn test_sensor_failure_is_no_detection() {
        let mut sensor = FakeSensor::seeing(alice());
        sensor.capture = Capture::Fail;
        let mut core = core(sensor, ScriptedButtons::released());
        assert_eq!(core.cycle().unwrap(), CycleOutcome::Unknown);
        assert_eq!(core.feedback().shown, vec![Shown::Unknown]);
    }

    #[test]
    fn test_unprotectable_probe_is_no_detection() {
        let mut core = core(
            FakeSensor::seeing(Encoding::new(vec![f64::NAN; 128])),
            ScriptedButtons::released(),
        );
        assert_eq!(core.cycle().unwrap(), CycleOutcome::Unknown);
    }

    #[test]
    fn test_only_first_region_encoded() {
        let mut sensor = FakeSensor::seeing(alice());
        sensor.regions = vec![Region::new(0, 0, 10, 10), Region::new(20, 20, 10, 10)];
        let mut core = core(sensor, ScriptedButtons::released());
        core.cycle().unwrap();
        assert_eq!(core.sensor.encoded, vec![Region::new(0, 0, 10, 10)]);
    }

    #[test]
    fn test_unmapped_identity_defaults() {
        let registry = IdentityRegistry::from_references(vec![(
            "Mallory".to_string(),
            protect(&alice()).unwrap(),
        )]);
        let mut core = DecisionCore::new(
            registry,
            settings(),
            FakeSensor::seeing(alice()),
            RecordingFeedback::default(),
            RecordingMotors::default(),
            ScriptedButtons::released(),
        );
        core.cycle().unwrap();
        assert_eq!(core.feedback().shown, vec![Shown::Digit(0)]);
        assert_eq!(core.actuator().actions, vec![Action::Stop, Action::Stop]);
    }

    #[test]
    fn test_stop_before_first_cycle() {
        let mut core = core(FakeSensor::seeing(alice()), ScriptedButtons::pressed_after(0));
        let summary = core.run().unwrap();

        assert_eq!(summary.cycles, 0);
        assert_eq!(core.state(), RunState::Stopped);
        assert_eq!(core.feedback().shown, vec![Shown::Startup, Shown::Clear]);
        assert!(core.actuator().actions.is_empty());
    }

    #[test]
    fn test_run_until_stop() {
        let mut core = core(FakeSensor::seeing(alice()), ScriptedButtons::pressed_after(3));
        let summary = core.run().unwrap();

        assert_eq!(
            summary,
            RunSummary {
                cycles: 3,
                recognized: 3,
                unknown: 0
            }
        );
        assert_eq!(core.state(), RunState::Stopped);
        assert_eq!(
            core.feedback().shown,
            vec![
                Shown::Startup,
                Shown::Digit(1),
                Shown::Digit(1),
                Shown::Digit(1),
                Shown::Clear
            ]
        );
    }

    #[test]
    fn test_stopped_is_terminal() {
        let mut core = core(FakeSensor::seeing(alice()), ScriptedButtons::new([true, false]));
        core.run().unwrap();
        // A second run neither restarts the loop nor polls again
        let summary = core.run().unwrap();
        assert_eq!(summary.cycles, 0);
        assert_eq!(core.state(), RunState::Stopped);
    }

    #[test]
    fn test_sink_failure_aborts_with_single_error_symbol() {
        let mut core = core(FakeSensor::seeing(alice()), ScriptedButtons::released());
        core.feedback.fail_digits = true;

        let err = core.run().unwrap_err();
        assert!(matches!(err, EngineError::UnhandledCycle { cycle: 1, .. }));
        assert_eq!(core.state(), RunState::Stopped);
        assert_eq!(
            core.feedback().shown,
            vec![Shown::Startup, Shown::Error, Shown::Clear]
        );
        let errors = core.feedback().shown.iter().filter(|s| **s == Shown::Error).count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_motor_failure_aborts_and_stops() {
        let mut core = core(FakeSensor::seeing(alice()), ScriptedButtons::released());
        core.actuator.fail = true;

        assert!(core.run().is_err());
        assert_eq!(core.actuator().actions, vec![Action::Stop]);
        assert_eq!(
            core.feedback().shown,
            vec![Shown::Startup, Shown::Digit(1), Shown::Error, Shown::Clear]
        );
    }

    #[test]
    fn test_unknown_cycles_counted() {
        let mut core = core(FakeSensor::seeing(stranger()), ScriptedButtons::pressed_after(2));
        let summary = core.run().unwrap();
        assert_eq!(summary.unknown, 2);
        assert_eq!(summary.recognized, 0);
    }

    /// Matches every probe to a fixed name, for exercising the matcher seam.
    struct FixedMatcher(&'static str);

    impl Matcher for FixedMatcher {
        fn compare(
            &self,
            _probe: &Encoding,
            _registry: &IdentityRegistry,
            _threshold: f32,
        ) -> Result<MatchResult, EncodingError> {
            Ok(MatchResult {
                matched: true,
                identity: Some(self.0.to_string()),
                score: 0.8,
            })
        }
    }

    #[test]
    fn test_custom_matcher() {
        let mut core = core(FakeSensor::seeing(stranger()), ScriptedButtons::released())
            .with_matcher(Box::new(FixedMatcher("Alice")));
        let outcome = core.cycle().unwrap();
        assert!(matches!(outcome, CycleOutcome::Recognized { score, .. } if score == 0.8));
        assert_eq!(core.actuator().actions, vec![Action::Forward, Action::Stop]);
    }

    #[test]
    fn test_simulated_devices_end_to_end() {
        use facebot_hw::{DifferentialDrive, LedMatrix, Shown as Matrix, SimulatedCamera};

        let camera = SimulatedCamera::new(320, 240, 128).with_probe(alice()).unwrap();
        let mut core = DecisionCore::new(
            alice_registry(),
            settings(),
            camera,
            LedMatrix::new(Vec::new(), 9),
            DifferentialDrive::new(512, 300),
            ScriptedButtons::pressed_after(1),
        );

        let outcome = core.cycle().unwrap();
        assert!(matches!(outcome, CycleOutcome::Recognized { digit: 1, .. }));
        assert_eq!(core.feedback().current(), Matrix::Digit(1));
        assert_eq!(core.actuator().duty(), (0, 0));

        core.run().unwrap();
        assert_eq!(core.feedback().current(), Matrix::Blank);
    }

    #[test]
    fn test_simulated_stranger_is_unknown() {
        use facebot_hw::{DifferentialDrive, LedMatrix, Shown as Matrix, SimulatedCamera};

        let camera = SimulatedCamera::new(320, 240, 128).with_seed(11);
        let mut core = DecisionCore::new(
            alice_registry(),
            settings(),
            camera,
            LedMatrix::new(Vec::new(), 9),
            DifferentialDrive::new(512, 300),
            ScriptedButtons::released(),
        );
        assert_eq!(core.cycle().unwrap(), CycleOutcome::Unknown);
        assert_eq!(core.feedback().current(), Matrix::Unknown);
    }

    #[test]
    fn test_settings_duplicate_name_keeps_first_entry() {
        let mut config = Config::default();
        config.identities.push(IdentityConfig {
            name: "Alice".into(),
            source: PathBuf::from("alice_again.json"),
            digit: Some(7),
            action: Some(Action::TurnLeft),
        });
        // First entry without a digit still wins over a later one that has it
        config.identities.push(IdentityConfig {
            name: "Dana".into(),
            source: PathBuf::from("dana.json"),
            digit: None,
            action: None,
        });
        config.identities.push(IdentityConfig {
            name: "Dana".into(),
            source: PathBuf::from("dana_again.json"),
            digit: Some(5),
            action: Some(Action::Forward),
        });

        let s = CycleSettings::from_config(&config);
        for name in ["Alice", "Dana"] {
            assert_eq!(s.digit_for(name), config.digit_for(name));
            assert_eq!(s.action_for(name), config.action_for(name));
        }
        assert_eq!(s.digit_for("Alice"), 1);
        assert_eq!(s.action_for("Alice"), Action::Forward);
        assert_eq!(s.digit_for("Dana"), 0);
        assert_eq!(s.action_for("Dana"), Action::Stop);
    }

    #[test]
    fn test_settings_from_default_config() {
        let mut config = Config::default();
        config.identities[1].digit = None;
        let s = CycleSettings::from_config(&config);
        assert_eq!(s.threshold, 0.70);
        assert_eq!(s.digit_for("Alice"), 1);
        assert_eq!(s.digit_for("Bob"), 0);
        assert_eq!(s.action_for("Bob"), Action::TurnRight);
        assert_eq!(s.action_for("nobody"), Action::Stop);
    }
}
