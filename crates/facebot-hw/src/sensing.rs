//! Sensing capability and a simulated camera.

use crate::frame::{Frame, Region};
use facebot_core::protect::check_dim;
use facebot_core::{Encoding, EncodingError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Face region the simulated detector reports for every frame.
pub const SIMULATED_REGION: Region = Region::new(50, 50, 100, 100);

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("sensing source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),
}

/// Produces frames, face regions and per-region encodings.
pub trait SensingSource {
    /// Capture one frame; `None` when nothing is available right now.
    fn capture_frame(&mut self) -> Result<Option<Frame>, SensorError>;

    /// Face regions in `frame`, possibly empty. Ordered by detector priority.
    fn detect_regions(&mut self, frame: &Frame) -> Result<Vec<Region>, SensorError>;

    /// Encoding of the face in `region`; `None` when the region yields nothing.
    fn encode(&mut self, frame: &Frame, region: &Region) -> Result<Option<Encoding>, SensorError>;
}

/// Camera stand-in: blank frames, one fixed face region, and either a
/// replayed probe encoding or a random one.
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    dim: usize,
    sequence: u32,
    probe: Option<Encoding>,
    rng: StdRng,
}

impl SimulatedCamera {
    pub fn new(width: u32, height: u32, dim: usize) -> Self {
        Self {
            width,
            height,
            dim,
            sequence: 0,
            probe: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replay `probe` for every detected face.
    pub fn with_probe(mut self, probe: Encoding) -> Result<Self, EncodingError> {
        check_dim(&probe, self.dim)?;
        self.probe = Some(probe);
        Ok(self)
    }

    /// Deterministic random encodings.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl SensingSource for SimulatedCamera {
    fn capture_frame(&mut self) -> Result<Option<Frame>, SensorError> {
        let pixels = self.width as usize * self.height as usize;
        if pixels == 0 {
            return Ok(None);
        }

        self.sequence = self.sequence.wrapping_add(1);
        let frame = Frame {
            data: vec![0; pixels],
            width: self.width,
            height: self.height,
            timestamp: std::time::Instant::now(),
            sequence: self.sequence,
        };
        tracing::trace!(
            seq = frame.sequence,
            brightness = frame.avg_brightness(),
            "simulated frame captured"
        );
        Ok(Some(frame))
    }

    fn detect_regions(&mut self, frame: &Frame) -> Result<Vec<Region>, SensorError> {
        if frame.contains(&SIMULATED_REGION) {
            tracing::trace!(seq = frame.sequence, area = SIMULATED_REGION.area(), "face region");
            Ok(vec![SIMULATED_REGION])
        } else {
            Ok(Vec::new())
        }
    }

    fn encode(&mut self, frame: &Frame, region: &Region) -> Result<Option<Encoding>, SensorError> {
        if !frame.contains(region) {
            return Ok(None);
        }
        let encoding = match &self.probe {
            Some(probe) => probe.clone(),
            None => Encoding::new((0..self.dim).map(|_| self.rng.gen::<f64>()).collect()),
        };
        Ok(Some(encoding))
    }
}
