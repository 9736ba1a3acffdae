//! # Liveness Monitor
//!
//! Two timers against the registry: one evicts sessions that stopped
//! sending, the other closes a statistics window and, every few windows,
//! logs a one-line status of the occupied slots.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::session::{SessionRegistry, SlotStatus};

#[derive(Debug)]
pub struct LivenessMonitor {
    registry: Arc<SessionRegistry>,
    timeout: Duration,
    eviction_interval: Duration,
    stats_interval: Duration,
    /// Stats windows between status lines; 0 disables them.
    status_log_windows: u32,
}

impl LivenessMonitor {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, config: &SessionConfig) -> Self {
        Self {
            registry,
            timeout: config.liveness_timeout(),
            eviction_interval: config.eviction_interval(),
            stats_interval: config.stats_interval(),
            status_log_windows: config.status_log_windows,
        }
    }

    /// One eviction pass. Returns the slots that were cleared.
    pub fn evict(&self, now: Instant) -> Vec<usize> {
        self.registry.evict_stale_at(self.timeout, now)
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Liveness monitor started (timeout {:?}, stats every {:?})",
            self.timeout, self.stats_interval
        );

        let mut eviction = interval(self.eviction_interval);
        eviction.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = interval(self.stats_interval);
        stats.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick of an interval completes immediately
        stats.tick().await;
        let mut window_start = Instant::now();
        let mut windows: u64 = 0;

        loop {
            tokio::select! {
                _ = eviction.tick() => {
                    let evicted = self.evict(Instant::now());
                    if !evicted.is_empty() {
                        debug!("Evicted slots {:?}", evicted);
                    }
                }
                _ = stats.tick() => {
                    let now = Instant::now();
                    self.registry.record_rates(now.saturating_duration_since(window_start));
                    window_start = now;
                    windows += 1;

                    if self.status_log_windows > 0 && windows % u64::from(self.status_log_windows) == 0 {
                        info!("{}", status_line(&self.registry.snapshot_at(now)));
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        debug!("Liveness monitor stopped");
    }
}

/// One-line summary of the slot table.
pub fn status_line(slots: &[SlotStatus]) -> String {
    let occupied: Vec<String> = slots
        .iter()
        .filter_map(|status| {
            status.session.as_ref().map(|s| {
                format!(
                    "[{}] {} {:.0}Hz age {}ms",
                    status.slot,
                    s.display_name,
                    s.sample_rate,
                    s.age.as_millis()
                )
            })
        })
        .collect();

    if occupied.is_empty() {
        return format!("0/{} slots occupied", slots.len());
    }
    format!(
        "{}/{} slots occupied: {}",
        occupied.len(),
        slots.len(),
        occupied.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::Sample;
    use std::net::SocketAddr;

    fn addr() -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 2], 40000))
    }

    fn monitor(registry: Arc<SessionRegistry>) -> LivenessMonitor {
        LivenessMonitor::new(registry, &SessionConfig::default())
    }

    #[test]
    fn test_evicts_after_timeout() {
        let registry = Arc::new(SessionRegistry::new());
        let t0 = Instant::now();
        registry.allocate_or_refresh_at("abc", "Phone1", addr(), t0).unwrap();
        let monitor = monitor(registry.clone());

        assert!(monitor.evict(t0 + Duration::from_millis(1900)).is_empty());
        assert_eq!(monitor.evict(t0 + Duration::from_millis(2100)), vec![0]);
        assert_eq!(registry.occupied(), 0);
    }

    #[test]
    fn test_telemetry_keeps_session_alive() {
        let registry = Arc::new(SessionRegistry::new());
        let t0 = Instant::now();
        let token = registry.allocate_or_refresh_at("abc", "Phone1", addr(), t0).unwrap().token;
        let monitor = monitor(registry.clone());

        registry.ingest_at("abc", &token, Sample::default(), addr(), t0 + Duration::from_millis(1500));
        assert!(monitor.evict(t0 + Duration::from_millis(3000)).is_empty());
        assert_eq!(registry.validate("abc", &token), Some(0));
    }

    #[test]
    fn test_status_line() {
        let registry = SessionRegistry::new();
        assert_eq!(status_line(&registry.snapshot()), "0/4 slots occupied");

        let now = Instant::now();
        registry.allocate_or_refresh_at("abc", "Phone1", addr(), now).unwrap();
        let line = status_line(&registry.snapshot_at(now));
        assert!(line.starts_with("1/4 slots occupied: [0] Phone1"), "{}", line);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let registry = Arc::new(SessionRegistry::new());
        let config = SessionConfig {
            eviction_interval_ms: 10,
            stats_interval_ms: 10,
            status_log_windows: 1,
            ..SessionConfig::default()
        };
        let monitor = LivenessMonitor::new(registry, &config);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(monitor.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}
