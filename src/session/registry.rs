//! # Session Registry
//!
//! Owns the slot table. Every read and write of a slot goes through the
//! methods here, under a single lock; nothing hands out references that
//! outlive a call, so eviction can never race with a caller holding a slot.
//!
//! Methods that depend on the clock come in two forms: the plain one reads
//! `Instant::now()`, the `_at` one takes the time explicitly.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use super::MAX_SLOTS;
use crate::error::{BridgeError, Result};
use crate::motion::MotionState;
use crate::protocol::messages::Sample;

/// Random bytes per session token.
const TOKEN_BYTES: usize = 16;

/// A paired device occupying a slot.
#[derive(Debug, Clone)]
pub struct Session {
    pub device_id: String,
    pub display_name: String,
    /// Most recent source address seen from the device.
    pub address: SocketAddr,
    token: String,
    pub last_sample: Sample,
    pub motion: MotionState,
    last_seen: Instant,
    paired_at: DateTime<Utc>,
}

impl Session {
    fn new(device_id: &str, display_name: &str, address: SocketAddr, now: Instant) -> Self {
        Self {
            device_id: device_id.to_string(),
            display_name: display_name.to_string(),
            address,
            token: generate_token(),
            last_sample: Sample::default(),
            motion: MotionState::default(),
            last_seen: now,
            paired_at: Utc::now(),
        }
    }

    /// Secret issued at pairing. Never changes for the life of the session.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    #[must_use]
    pub fn paired_at(&self) -> DateTime<Utc> {
        self.paired_at
    }

    fn seen(&mut self, now: Instant) {
        self.last_seen = self.last_seen.max(now);
    }
}

/// Outcome of a successful pairing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub slot: usize,
    pub token: String,
    /// `false` when an existing session was refreshed.
    pub created: bool,
}

/// Dashboard view of one occupied slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub device_id: String,
    pub display_name: String,
    pub address: SocketAddr,
    /// Time since the last accepted packet.
    pub age: Duration,
    /// Packets per second over the last statistics window.
    pub sample_rate: f64,
    pub paired_at: DateTime<Utc>,
}

/// Dashboard view of one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotStatus {
    pub slot: usize,
    pub session: Option<SessionSummary>,
}

#[derive(Debug, Default)]
struct SlotStats {
    packets: u64,
    sample_rate: f64,
}

#[derive(Debug, Default)]
struct SlotEntry {
    session: Option<Session>,
    stats: SlotStats,
}

impl SlotEntry {
    fn clear(&mut self) {
        self.session = None;
        self.stats = SlotStats::default();
    }
}

/// Fixed-size table of device slots.
#[derive(Debug)]
pub struct SessionRegistry {
    slots: Mutex<[SlotEntry; MAX_SLOTS]>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(std::array::from_fn(|_| SlotEntry::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, [SlotEntry; MAX_SLOTS]> {
        // Slot data stays consistent even if a holder panicked mid-call
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Slot currently held by `device_id`, if any.
    #[must_use]
    pub fn find_by_device(&self, device_id: &str) -> Option<usize> {
        find(self.lock().as_slice(), device_id)
    }

    /// Pair a device, or refresh its existing session
    ///
    /// A known device keeps its slot and token; only its name and address
    /// change. An unknown device gets the lowest free slot and a new token.
    ///
    /// # Errors
    ///
    /// Returns `NoFreeSlots` if the device is unknown and every slot is taken.
    /// The table is left untouched in that case.
    pub fn allocate_or_refresh(
        &self,
        device_id: &str,
        display_name: &str,
        address: SocketAddr,
    ) -> Result<Pairing> {
        self.allocate_or_refresh_at(device_id, display_name, address, Instant::now())
    }

    pub fn allocate_or_refresh_at(
        &self,
        device_id: &str,
        display_name: &str,
        address: SocketAddr,
        now: Instant,
    ) -> Result<Pairing> {
        let mut slots = self.lock();

        if let Some(slot) = find(slots.as_slice(), device_id) {
            if let Some(session) = slots[slot].session.as_mut() {
                session.display_name = display_name.to_string();
                session.address = address;
                session.seen(now);
                return Ok(Pairing {
                    slot,
                    token: session.token.clone(),
                    created: false,
                });
            }
        }

        let slot = slots
            .iter()
            .position(|entry| entry.session.is_none())
            .ok_or(BridgeError::NoFreeSlots)?;

        let session = Session::new(device_id, display_name, address, now);
        let token = session.token.clone();
        slots[slot].clear();
        slots[slot].session = Some(session);

        Ok(Pairing { slot, token, created: true })
    }

    /// Slot held by `device_id` if and only if `token` matches its session.
    ///
    /// Unknown devices and wrong tokens are indistinguishable to the caller.
    #[must_use]
    pub fn validate(&self, device_id: &str, token: &str) -> Option<usize> {
        validate(self.lock().as_slice(), device_id, token)
    }

    /// Store a new sample for an occupied slot
    ///
    /// Updates the sample, source address, and liveness timestamp, and counts
    /// the packet for rate statistics. Returns `false` if the slot is empty.
    pub fn touch(&self, slot: usize, sample: Sample, address: SocketAddr) -> bool {
        self.touch_at(slot, sample, address, Instant::now())
    }

    pub fn touch_at(&self, slot: usize, sample: Sample, address: SocketAddr, now: Instant) -> bool {
        let mut slots = self.lock();
        match slots.get_mut(slot) {
            Some(entry) => touch_entry(entry, sample, address, now),
            None => false,
        }
    }

    /// Validate credentials and store the sample under one lock.
    ///
    /// Equivalent to [`validate`](Self::validate) followed by
    /// [`touch`](Self::touch), without a window in which the slot could be
    /// evicted and handed to another device in between.
    pub fn ingest(
        &self,
        device_id: &str,
        token: &str,
        sample: Sample,
        address: SocketAddr,
    ) -> Option<usize> {
        self.ingest_at(device_id, token, sample, address, Instant::now())
    }

    pub fn ingest_at(
        &self,
        device_id: &str,
        token: &str,
        sample: Sample,
        address: SocketAddr,
        now: Instant,
    ) -> Option<usize> {
        let mut slots = self.lock();
        let slot = validate(slots.as_slice(), device_id, token)?;
        touch_entry(&mut slots[slot], sample, address, now).then_some(slot)
    }

    /// Clear every slot not touched within `timeout`. Returns the cleared slots.
    pub fn evict_stale(&self, timeout: Duration) -> Vec<usize> {
        self.evict_stale_at(timeout, Instant::now())
    }

    pub fn evict_stale_at(&self, timeout: Duration, now: Instant) -> Vec<usize> {
        let mut slots = self.lock();
        let mut evicted = Vec::new();

        for (slot, entry) in slots.iter_mut().enumerate() {
            let Some(session) = entry.session.as_ref() else {
                continue;
            };
            if now.saturating_duration_since(session.last_seen) > timeout {
                info!(
                    "Slot {} timed out ({} / {})",
                    slot, session.display_name, session.device_id
                );
                entry.clear();
                evicted.push(slot);
            }
        }

        evicted
    }

    /// Explicitly end the session in `slot`. Returns `false` if it was empty.
    pub fn disconnect(&self, slot: usize) -> bool {
        let mut slots = self.lock();
        let Some(entry) = slots.get_mut(slot) else {
            return false;
        };
        match entry.session.take() {
            Some(session) => {
                info!("Slot {} disconnected ({})", slot, session.device_id);
                entry.clear();
                true
            }
            None => false,
        }
    }

    /// Close a statistics window of length `elapsed`
    ///
    /// Each slot's sample rate becomes packets counted since the previous
    /// window divided by `elapsed`, and the counters restart.
    pub fn record_rates(&self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return;
        }

        let mut slots = self.lock();
        for entry in slots.iter_mut() {
            entry.stats.sample_rate = entry.stats.packets as f64 / secs;
            entry.stats.packets = 0;
        }
    }

    /// Packets per second over the last statistics window.
    #[must_use]
    pub fn sample_rate(&self, slot: usize) -> f64 {
        self.lock().get(slot).map_or(0.0, |entry| entry.stats.sample_rate)
    }

    #[must_use]
    pub fn occupied(&self) -> usize {
        self.lock().iter().filter(|e| e.session.is_some()).count()
    }

    /// Run `f` against the session in `slot`, if occupied.
    ///
    /// The lock is held for the duration of `f`; keep it short.
    pub fn with_session_mut<R>(&self, slot: usize, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut slots = self.lock();
        slots.get_mut(slot)?.session.as_mut().map(f)
    }

    /// Status of every slot, for display.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SlotStatus> {
        self.snapshot_at(Instant::now())
    }

    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> Vec<SlotStatus> {
        self.lock()
            .iter()
            .enumerate()
            .map(|(slot, entry)| SlotStatus {
                slot,
                session: entry.session.as_ref().map(|s| SessionSummary {
                    device_id: s.device_id.clone(),
                    display_name: s.display_name.clone(),
                    address: s.address,
                    age: now.saturating_duration_since(s.last_seen),
                    sample_rate: entry.stats.sample_rate,
                    paired_at: s.paired_at,
                }),
            })
            .collect()
    }
}

fn find(slots: &[SlotEntry], device_id: &str) -> Option<usize> {
    slots.iter().position(|entry| {
        entry
            .session
            .as_ref()
            .is_some_and(|s| s.device_id == device_id)
    })
}

fn validate(slots: &[SlotEntry], device_id: &str, token: &str) -> Option<usize> {
    let slot = find(slots, device_id)?;
    let session = slots[slot].session.as_ref()?;
    (session.token == token).then_some(slot)
}

fn touch_entry(entry: &mut SlotEntry, sample: Sample, address: SocketAddr, now: Instant) -> bool {
    let Some(session) = entry.session.as_mut() else {
        debug!("Dropping sample for empty slot");
        return false;
    };
    session.last_sample = sample;
    session.address = address;
    session.seen(now);
    entry.stats.packets += 1;
    true
}
