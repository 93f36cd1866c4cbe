//! Ambulance position simulation.
//!
//! [`PositionSimulator::simulate`] interpolates linearly between two
//! coordinates in evenly spaced steps. The same frames are available two
//! ways:
//!
//! - [`Frames`] -- a pure iterator, no timing, for tests and previews.
//! - [`Simulation`] -- frames paced by the tick interval, consumed with
//!   [`Simulation::next`] or as a `futures::Stream`.
//!
//! The last frame is always exactly the destination with progress `1.0`
//! and is delivered as [`SimEvent::Arrived`].

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use goldenhour_types::{Coordinates, SimPosition};
use tokio::sync::watch;
use tracing::debug;

use crate::config::SimConfig;
use crate::error::SimulationError;

/// One simulation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// The ambulance moved.
    Moved(SimPosition),
    /// The ambulance reached its destination. Emitted once, last.
    Arrived(SimPosition),
}

impl SimEvent {
    /// Position carried by the frame.
    pub const fn position(&self) -> SimPosition {
        match self {
            Self::Moved(p) | Self::Arrived(p) => *p,
        }
    }

    /// Whether this is the arrival frame.
    pub const fn is_arrival(&self) -> bool {
        matches!(self, Self::Arrived(_))
    }
}

/// Produces interpolated routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSimulator {
    tick_interval: Duration,
    max_steps: u32,
}

impl Default for PositionSimulator {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

impl PositionSimulator {
    /// Simulator with the given frame interval and frame cap.
    pub const fn new(config: &SimConfig) -> Self {
        Self {
            tick_interval: config.tick_interval,
            max_steps: if config.max_steps == 0 { 1 } else { config.max_steps },
        }
    }

    /// Time between frames.
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of frames for a trip of `duration`.
    ///
    /// `duration / tick_interval`, clamped to `[1, max_steps]`.
    pub fn step_count(&self, duration: Duration) -> u32 {
        let tick_ms = self.tick_interval.as_millis().max(1);
        let steps = duration.as_millis().checked_div(tick_ms).unwrap_or(0);
        u32::try_from(steps)
            .unwrap_or(u32::MAX)
            .clamp(1, self.max_steps)
    }

    /// Pure frame sequence for a trip of `duration`.
    pub fn frames(
        &self,
        start: Coordinates,
        end: Coordinates,
        duration: Duration,
    ) -> Result<Frames, SimulationError> {
        validate("start", start)?;
        validate("end", end)?;
        Ok(Frames::new(start, end, self.step_count(duration)))
    }

    /// Timed, cancellable simulation of a trip of `duration`.
    pub fn simulate(
        &self,
        start: Coordinates,
        end: Coordinates,
        duration: Duration,
    ) -> Result<Simulation, SimulationError> {
        let frames = self.frames(start, end, duration)?;
        debug!(
            steps = frames.steps,
            tick_ms = u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX),
            "simulation prepared"
        );
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Ok(Simulation {
            frames,
            tick_interval: self.tick_interval,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
            finished: false,
        })
    }
}

fn validate(endpoint: &'static str, at: Coordinates) -> Result<(), SimulationError> {
    if at.is_valid() {
        Ok(())
    } else {
        Err(SimulationError::InvalidCoordinate {
            endpoint,
            lat: at.lat,
            lng: at.lng,
        })
    }
}

/// Evenly spaced interpolation from start to end.
///
/// Yields `steps` frames; frame `i` sits at progress `i / steps`, so the
/// start point itself is not repeated.
#[derive(Debug, Clone)]
pub struct Frames {
    start: Coordinates,
    end: Coordinates,
    steps: u32,
    next: u32,
}

impl Frames {
    fn new(start: Coordinates, end: Coordinates, steps: u32) -> Self {
        Self {
            start,
            end,
            steps: steps.max(1),
            next: 1,
        }
    }

    /// Total number of frames.
    pub const fn steps(&self) -> u32 {
        self.steps
    }
}

impl Iterator for Frames {
    type Item = SimEvent;

    fn next(&mut self) -> Option<SimEvent> {
        if self.next > self.steps {
            return None;
        }
        let step = self.next;
        self.next = self.next.saturating_add(1);

        if step == self.steps {
            return Some(SimEvent::Arrived(SimPosition {
                lat: self.end.lat,
                lng: self.end.lng,
                progress: 1.0,
            }));
        }

        let progress = f64::from(step) / f64::from(self.steps);
        Some(SimEvent::Moved(SimPosition {
            lat: lerp(self.start.lat, self.end.lat, progress),
            lng: lerp(self.start.lng, self.end.lng, progress),
            progress,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(
            self.steps
                .saturating_add(1)
                .saturating_sub(self.next),
        )
        .unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames {}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    (to - from).mul_add(t, from)
}

/// Cancels a running [`Simulation`] from anywhere.
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    cancel: Arc<watch::Sender<bool>>,
}

impl SimulationHandle {
    /// Stop the simulation. No frame is delivered afterwards.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// A timed simulation; one frame per tick interval.
///
/// Once cancelled or finished it yields nothing more and cannot be
/// restarted.
#[derive(Debug)]
pub struct Simulation {
    frames: Frames,
    tick_interval: Duration,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    finished: bool,
}

impl Simulation {
    /// Handle for cancelling this simulation.
    pub fn handle(&self) -> SimulationHandle {
        SimulationHandle {
            cancel: Arc::clone(&self.cancel_tx),
        }
    }

    /// Total number of frames.
    pub const fn steps(&self) -> u32 {
        self.frames.steps
    }

    /// Wait one tick interval and return the next frame.
    ///
    /// Returns `None` after arrival or cancellation.
    pub async fn next(&mut self) -> Option<SimEvent> {
        if self.finished || *self.cancel_rx.borrow() {
            self.finished = true;
            return None;
        }

        tokio::select! {
            biased;
            _ = self.cancel_rx.changed() => {
                self.finished = true;
                return None;
            }
            () = tokio::time::sleep(self.tick_interval) => {}
        }

        let event = self.frames.next();
        if event.is_none_or(|e| e.is_arrival()) {
            self.finished = true;
        }
        event
    }

    /// Consume the simulation as a stream of frames.
    pub fn into_stream(self) -> impl Stream<Item = SimEvent> + Send {
        futures::stream::unfold(self, |mut simulation| async move {
            simulation.next().await.map(|event| (event, simulation))
        })
    }
}
