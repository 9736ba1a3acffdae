//! # Gestures
//!
//! Discrete events derived from held buttons and sharp motion.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum HoldState {
    #[default]
    Released,
    Holding {
        since: Instant,
    },
    /// Fired for the current press; waits for release.
    Latched,
}

/// Fires once when a button has been held continuously for a set time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldGesture {
    state: HoldState,
}

impl HoldGesture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the button state for one tick. Returns `true` on the tick the
    /// hold reaches `hold`, and never again until the button is released.
    pub fn update(&mut self, pressed: bool, now: Instant, hold: Duration) -> bool {
        if !pressed {
            self.state = HoldState::Released;
            return false;
        }

        let since = match self.state {
            HoldState::Latched => return false,
            HoldState::Released => {
                self.state = HoldState::Holding { since: now };
                now
            }
            HoldState::Holding { since } => since,
        };

        if now.saturating_duration_since(since) >= hold {
            self.state = HoldState::Latched;
            return true;
        }
        false
    }
}

/// Detects swings on the accelerometer x axis, rate-limited by a cooldown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwingDetector {
    last_swing: Option<Instant>,
}

impl SwingDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `accel_x` exceeds `threshold` in magnitude and at
    /// least `cooldown` has passed since the previous swing.
    pub fn update(&mut self, accel_x: f64, now: Instant, threshold: f64, cooldown: Duration) -> bool {
        if accel_x.abs() <= threshold {
            return false;
        }

        let cooled_down = self
            .last_swing
            .map_or(true, |last| now.saturating_duration_since(last) >= cooldown);

        if cooled_down {
            self.last_swing = Some(now);
        }
        cooled_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: Duration = Duration::from_millis(600);
    const COOLDOWN: Duration = Duration::from_millis(250);

    /// Holds for `hold_ms` sampled every 10 ms, then releases. Returns the number of firings.
    fn hold_for(gesture: &mut HoldGesture, t0: Instant, hold_ms: u64) -> usize {
        let mut fired = 0;
        let mut t = 0;
        while t <= hold_ms {
            if gesture.update(true, t0 + Duration::from_millis(t), HOLD) {
                fired += 1;
            }
            t += 10;
        }
        if gesture.update(false, t0 + Duration::from_millis(t), HOLD) {
            fired += 1;
        }
        fired
    }

    #[test]
    fn test_short_hold_does_not_fire() {
        let mut gesture = HoldGesture::new();
        assert_eq!(hold_for(&mut gesture, Instant::now(), 590), 0);
        assert_eq!(gesture, HoldGesture::new());
    }

    #[test]
    fn test_long_hold_fires_once() {
        let mut gesture = HoldGesture::new();
        assert_eq!(hold_for(&mut gesture, Instant::now(), 610), 1);
    }

    #[test]
    fn test_very_long_hold_fires_once() {
        let mut gesture = HoldGesture::new();
        assert_eq!(hold_for(&mut gesture, Instant::now(), 5000), 1);
    }

    #[test]
    fn test_release_cancels_pending_hold() {
        let mut gesture = HoldGesture::new();
        let t0 = Instant::now();
        assert!(!gesture.update(true, t0, HOLD));
        assert!(!gesture.update(false, t0 + Duration::from_millis(300), HOLD));
        // New press restarts the timer
        assert!(!gesture.update(true, t0 + Duration::from_millis(310), HOLD));
        assert!(!gesture.update(true, t0 + Duration::from_millis(700), HOLD));
        assert!(gesture.update(true, t0 + Duration::from_millis(910), HOLD));
    }

    #[test]
    fn test_refires_after_release() {
        let mut gesture = HoldGesture::new();
        let t0 = Instant::now();
        assert_eq!(hold_for(&mut gesture, t0, 700), 1);
        assert_eq!(hold_for(&mut gesture, t0 + Duration::from_secs(2), 700), 1);
    }

    #[test]
    fn test_swing_cooldown() {
        let mut swing = SwingDetector::new();
        let t0 = Instant::now();
        let events = (0..3)
            .filter(|k| swing.update(3.0, t0 + Duration::from_millis(100 * k), 2.3, COOLDOWN))
            .count();
        assert_eq!(events, 1);
    }

    #[test]
    fn test_swing_after_cooldown() {
        let mut swing = SwingDetector::new();
        let t0 = Instant::now();
        assert!(swing.update(-3.0, t0, 2.3, COOLDOWN));
        assert!(!swing.update(-3.0, t0 + Duration::from_millis(249), 2.3, COOLDOWN));
        assert!(swing.update(-3.0, t0 + Duration::from_millis(250), 2.3, COOLDOWN));
        assert!(!swing.update(-3.0, t0 + Duration::from_millis(260), 2.3, COOLDOWN));
    }

    #[test]
    fn test_below_threshold_never_swings() {
        let mut swing = SwingDetector::new();
        let t0 = Instant::now();
        assert!(!swing.update(2.3, t0, 2.3, COOLDOWN));
        assert!(!swing.update(-1.0, t0 + Duration::from_secs(1), 2.3, COOLDOWN));
    }
}
