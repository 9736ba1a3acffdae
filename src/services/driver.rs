//! # Driver Emitter
//!
//! Fixed-rate control loop. Each tick reads the active slot, runs motion
//! fusion on that slot's latest sample and sends one control line to the
//! driver sink. An empty active slot sends nothing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::motion::MotionFusionEngine;
use crate::net::sink::ControlSink;
use crate::protocol::encoder::encode_control_line;
use crate::session::{ActiveSlot, SessionRegistry};

pub struct DriverEmitter<S> {
    registry: Arc<SessionRegistry>,
    active: Arc<ActiveSlot>,
    engine: MotionFusionEngine,
    sink: S,
    period: Duration,
}

impl<S: ControlSink> DriverEmitter<S> {
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        active: Arc<ActiveSlot>,
        engine: MotionFusionEngine,
        sink: S,
        period: Duration,
    ) -> Self {
        Self {
            registry,
            active,
            engine,
            sink,
            period,
        }
    }

    /// Run one control tick at `now`. Returns the line sent, if any.
    pub fn tick(&self, now: Instant) -> Option<String> {
        let slot = self.active.get();

        // Occupancy is checked again on every tick; the slot may have been
        // evicted or re-paired since the last one
        let frame = self.registry.with_session_mut(slot, |session| {
            let sample = session.last_sample;
            self.engine.frame(&mut session.motion, &sample, now)
        })?;

        let line = encode_control_line(&frame);
        self.sink.dispatch(&line);
        Some(line)
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!("Driver output every {:?}", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut sent: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick(Instant::now()).is_some() {
                        sent += 1;
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        debug!("Driver emitter stopped after {} lines", sent);
    }
}
