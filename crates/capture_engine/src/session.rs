//! # Capture Session Manager
//!
//! Owns every in-progress capture attempt. A session is keyed by
//! `(point id, player id)` and is either present (active) or absent; there is
//! no paused state.
//!
//! ## Lifecycle
//!
//! ```text
//! start_session ──► ACTIVE ──► complete_session ──► (absent, outcome notified)
//!                     │
//!                     ├──► cancel_session(reason) ──► (absent)
//!                     └──► tick: left capture ring ──► cancel(ZoneExit)
//! ```
//!
//! Cancellation is idempotent: cancelling an absent key is a no-op, because
//! several triggers (death, zone exit, disconnect) may land in the same tick.
//!
//! Nothing outside this module mutates the session collection.

use crate::error::CaptureError;
use crate::types::{Location, PlayerId};
use crate::zone::{ZoneClass, ZoneIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Why a session ended without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Death,
    ZoneExit,
    Disconnect,
    AdminOverride,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CancelReason::Death => "death",
            CancelReason::ZoneExit => "zone exit",
            CancelReason::Disconnect => "disconnect",
            CancelReason::AdminOverride => "admin override",
        };
        f.write_str(label)
    }
}

/// Presence state of a session. Absent sessions are simply not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Active,
}

/// Identity of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub point_id: String,
    pub player_id: PlayerId,
}

impl SessionKey {
    pub fn new(point_id: impl Into<String>, player_id: PlayerId) -> Self {
        Self {
            point_id: point_id.into(),
            player_id,
        }
    }
}

/// One player's in-progress attempt at one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSession {
    pub point_id: String,
    pub player_id: PlayerId,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    /// Ticks spent inside the capture ring since the session started
    pub progress: u32,
    /// Reinforcements successfully spawned for this session
    pub reinforcements: u32,
}

impl CaptureSession {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.point_id.clone(), self.player_id.clone())
    }
}

/// Receives capture results. Implemented by the host.
pub trait CaptureOutcome: Send + Sync {
    /// A session finished successfully and has been removed.
    fn capture_completed(&self, session: &CaptureSession, finished_at: DateTime<Utc>);

    /// A session was cancelled and has been removed.
    fn capture_cancelled(&self, _session: &CaptureSession, _reason: CancelReason) {}
}

/// Answers where a player currently is.
pub trait PlayerLocator {
    fn locate(&self, player: &PlayerId) -> Option<Location>;
}

/// What one tick did to the session set.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    /// Sessions that were still inside their capture ring and gained progress
    pub progressed: Vec<SessionKey>,
    /// Sessions that reached their point's `capture_ticks` and were completed
    pub completed: Vec<SessionKey>,
    /// Sessions removed during re-validation
    pub cancelled: Vec<(SessionKey, CancelReason)>,
    /// Surviving sessions due a reinforcement this tick
    pub reinforcements_due: Vec<SessionKey>,
}

/// Exclusive owner of the session collection.
pub struct CaptureSessionManager {
    sessions: BTreeMap<SessionKey, CaptureSession>,
    zones: Arc<ZoneIndex>,
    outcome: Arc<dyn CaptureOutcome>,
}

impl CaptureSessionManager {
    pub fn new(zones: Arc<ZoneIndex>, outcome: Arc<dyn CaptureOutcome>) -> Self {
        Self {
            sessions: BTreeMap::new(),
            zones,
            outcome,
        }
    }

    /// Starts a session for `(point_id, player_id)`.
    ///
    /// Fails with [`CaptureError::AlreadyActive`] when that exact key already
    /// has a session. Sessions for the same player at other points are not
    /// checked here.
    pub fn start_session(
        &mut self,
        point_id: &str,
        player_id: &PlayerId,
        now: DateTime<Utc>,
    ) -> Result<&CaptureSession, CaptureError> {
        let key = SessionKey::new(point_id, player_id.clone());
        if self.sessions.contains_key(&key) {
            return Err(CaptureError::AlreadyActive {
                point: point_id.to_string(),
                player: player_id.clone(),
            });
        }

        info!("🏁 {} started capturing '{}'", player_id, point_id);
        let session = CaptureSession {
            point_id: point_id.to_string(),
            player_id: player_id.clone(),
            state: SessionState::Active,
            started_at: now,
            progress: 0,
            reinforcements: 0,
        };
        Ok(&*self.sessions.entry(key).or_insert(session))
    }

    /// Removes the session if present. Absent keys are a no-op.
    pub fn cancel_session(
        &mut self,
        point_id: &str,
        player_id: &PlayerId,
        reason: CancelReason,
    ) -> Option<CaptureSession> {
        let key = SessionKey::new(point_id, player_id.clone());
        self.cancel_key(&key, reason)
    }

    /// Removes the session and reports it to the outcome collaborator.
    pub fn complete_session(
        &mut self,
        point_id: &str,
        player_id: &PlayerId,
        now: DateTime<Utc>,
    ) -> Result<CaptureSession, CaptureError> {
        let key = SessionKey::new(point_id, player_id.clone());
        let session = self
            .sessions
            .remove(&key)
            .ok_or_else(|| CaptureError::NotActive {
                point: point_id.to_string(),
                player: player_id.clone(),
            })?;

        let elapsed = now.signed_duration_since(session.started_at);
        info!(
            "🚩 {} captured '{}' after {}s ({} ticks)",
            player_id,
            point_id,
            elapsed.num_seconds(),
            session.progress
        );
        self.outcome.capture_completed(&session, now);
        Ok(session)
    }

    /// Cancels every session held by `player_id`, at any point.
    pub fn cancel_player_sessions(&mut self, player_id: &PlayerId, reason: CancelReason) -> Vec<CaptureSession> {
        let keys: Vec<SessionKey> = self
            .sessions
            .keys()
            .filter(|key| &key.player_id == player_id)
            .cloned()
            .collect();

        keys.iter()
            .filter_map(|key| self.cancel_key(key, reason))
            .collect()
    }

    /// Death notification: every session owned by the player ends with
    /// [`CancelReason::Death`].
    pub fn on_player_death(&mut self, player_id: &PlayerId) -> Vec<CaptureSession> {
        self.cancel_player_sessions(player_id, CancelReason::Death)
    }

    /// Re-validates every active session against its player's location.
    ///
    /// - point no longer configured -> cancelled with `AdminOverride`
    /// - player location unknown -> cancelled with `Disconnect`
    /// - player not inside the capture ring -> cancelled with `ZoneExit`
    /// - otherwise progress advances; reaching `capture_ticks` completes the session
    pub fn tick(&mut self, now: DateTime<Utc>, locator: &dyn PlayerLocator) -> TickReport {
        let mut report = TickReport::default();
        let keys: Vec<SessionKey> = self.sessions.keys().cloned().collect();

        for key in keys {
            let Some(point) = self.zones.get(&key.point_id) else {
                self.cancel_key(&key, CancelReason::AdminOverride);
                report.cancelled.push((key, CancelReason::AdminOverride));
                continue;
            };

            let Some(location) = locator.locate(&key.player_id) else {
                self.cancel_key(&key, CancelReason::Disconnect);
                report.cancelled.push((key, CancelReason::Disconnect));
                continue;
            };

            if point.classify(&location).class != ZoneClass::InsideCapture {
                self.cancel_key(&key, CancelReason::ZoneExit);
                report.cancelled.push((key, CancelReason::ZoneExit));
                continue;
            }

            let Some(session) = self.sessions.get_mut(&key) else {
                continue;
            };
            session.progress = session.progress.saturating_add(1);
            let progress = session.progress;
            let reinforcements = session.reinforcements;
            report.progressed.push(key.clone());

            if point.capture_ticks > 0 && progress >= point.capture_ticks {
                if self.complete_session(&key.point_id, &key.player_id, now).is_ok() {
                    report.completed.push(key);
                }
                continue;
            }

            if point.reinforcement_interval > 0
                && progress % point.reinforcement_interval == 0
                && reinforcements < point.max_reinforcements
            {
                report.reinforcements_due.push(key);
            }
        }

        report
    }

    /// Counts a reinforcement spawned for the session, if it is still active.
    pub fn record_reinforcement(&mut self, key: &SessionKey) {
        if let Some(session) = self.sessions.get_mut(key) {
            session.reinforcements += 1;
        }
    }

    pub fn get(&self, point_id: &str, player_id: &PlayerId) -> Option<&CaptureSession> {
        self.sessions
            .get(&SessionKey::new(point_id, player_id.clone()))
    }

    pub fn is_active(&self, point_id: &str, player_id: &PlayerId) -> bool {
        self.get(point_id, player_id).is_some()
    }

    pub fn sessions_for<'a>(&'a self, player_id: &'a PlayerId) -> impl Iterator<Item = &'a CaptureSession> + 'a {
        self.sessions
            .values()
            .filter(move |session| &session.player_id == player_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaptureSession> {
        self.sessions.values()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn cancel_key(&mut self, key: &SessionKey, reason: CancelReason) -> Option<CaptureSession> {
        match self.sessions.remove(key) {
            Some(session) => {
                info!(
                    "🏳️ Capture of '{}' by {} cancelled ({})",
                    key.point_id, key.player_id, reason
                );
                self.outcome.capture_cancelled(&session, reason);
                Some(session)
            }
            None => {
                debug!(
                    "Cancel of '{}' by {} ignored: no active session",
                    key.point_id, key.player_id
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use crate::zone::CapturePoint;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingOutcome {
        completed: Mutex<Vec<SessionKey>>,
        cancelled: Mutex<Vec<(SessionKey, CancelReason)>>,
    }

    impl CaptureOutcome for RecordingOutcome {
        fn capture_completed(&self, session: &CaptureSession, _finished_at: DateTime<Utc>) {
            self.completed.lock().unwrap().push(session.key());
        }

        fn capture_cancelled(&self, session: &CaptureSession, reason: CancelReason) {
            self.cancelled.lock().unwrap().push((session.key(), reason));
        }
    }

    #[derive(Default)]
    struct Positions(HashMap<PlayerId, Location>);

    impl PlayerLocator for Positions {
        fn locate(&self, player: &PlayerId) -> Option<Location> {
            self.0.get(player).cloned()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn manager_with(points: Vec<CapturePoint>) -> (CaptureSessionManager, Arc<RecordingOutcome>) {
        let zones = Arc::new(ZoneIndex::new(points).unwrap());
        let outcome = Arc::new(RecordingOutcome::default());
        (CaptureSessionManager::new(zones, outcome.clone()), outcome)
    }

    fn hill() -> CapturePoint {
        CapturePoint::new("HillA", "W", Position::new(0.0, 0.0, 0.0), 2)
    }

    fn alice() -> PlayerId {
        PlayerId::from("alice")
    }

    #[test]
    fn duplicate_start_fails_with_already_active() {
        let (mut manager, _) = manager_with(vec![hill()]);

        manager.start_session("HillA", &alice(), t0()).unwrap();
        let err = manager.start_session("HillA", &alice(), t0()).unwrap_err();

        assert_eq!(
            err,
            CaptureError::AlreadyActive {
                point: "HillA".to_string(),
                player: alice()
            }
        );
        assert_eq!(manager.active_count(), 1);
    }

    #[test]
    fn other_player_may_start_at_same_point() {
        let (mut manager, _) = manager_with(vec![hill()]);

        manager.start_session("HillA", &alice(), t0()).unwrap();
        manager
            .start_session("HillA", &PlayerId::from("bob"), t0())
            .unwrap();

        assert_eq!(manager.active_count(), 2);
    }

    #[test]
    fn start_records_timestamp_and_zero_progress() {
        let (mut manager, _) = manager_with(vec![hill()]);
        let session = manager.start_session("HillA", &alice(), t0()).unwrap();

        assert_eq!(session.started_at, t0());
        assert_eq!(session.progress, 0);
        assert_eq!(session.state, SessionState::Active);
    }

    #[test]
    fn cancel_is_idempotent() {
        let (mut manager, outcome) = manager_with(vec![hill()]);
        manager.start_session("HillA", &alice(), t0()).unwrap();

        assert!(manager
            .cancel_session("HillA", &alice(), CancelReason::ZoneExit)
            .is_some());
        assert!(manager
            .cancel_session("HillA", &alice(), CancelReason::ZoneExit)
            .is_none());

        assert!(!manager.is_active("HillA", &alice()));
        assert_eq!(outcome.cancelled.lock().unwrap().len(), 1);
    }

    #[test]
    fn complete_absent_session_fails_with_not_active() {
        let (mut manager, outcome) = manager_with(vec![hill()]);

        let err = manager.complete_session("HillA", &alice(), t0()).unwrap_err();
        assert!(matches!(err, CaptureError::NotActive { .. }));
        assert!(outcome.completed.lock().unwrap().is_empty());
    }

    #[test]
    fn complete_removes_and_notifies() {
        let (mut manager, outcome) = manager_with(vec![hill()]);
        manager.start_session("HillA", &alice(), t0()).unwrap();

        let session = manager.complete_session("HillA", &alice(), t0()).unwrap();

        assert_eq!(session.point_id, "HillA");
        assert!(!manager.is_active("HillA", &alice()));
        assert_eq!(
            *outcome.completed.lock().unwrap(),
            vec![SessionKey::new("HillA", alice())]
        );
    }

    #[test]
    fn death_cancels_every_session_of_that_player_only() {
        let second = CapturePoint::new("Fort", "W", Position::new(800.0, 0.0, 0.0), 2);
        let (mut manager, outcome) = manager_with(vec![hill(), second]);
        let bob = PlayerId::from("bob");

        manager.start_session("HillA", &alice(), t0()).unwrap();
        manager.start_session("Fort", &alice(), t0()).unwrap();
        manager.start_session("HillA", &bob, t0()).unwrap();

        let cancelled = manager.on_player_death(&alice());

        assert_eq!(cancelled.len(), 2);
        assert_eq!(manager.sessions_for(&alice()).count(), 0);
        assert!(manager.is_active("HillA", &bob));
        assert!(outcome
            .cancelled
            .lock()
            .unwrap()
            .iter()
            .all(|(_, reason)| *reason == CancelReason::Death));
    }

    #[test]
    fn tick_cancels_player_who_left_capture_ring() {
        let (mut manager, _) = manager_with(vec![hill()]);
        manager.start_session("HillA", &alice(), t0()).unwrap();

        let mut positions = Positions::default();
        // 2.5 chunks away: buffer ring, no longer capturing.
        positions.0.insert(alice(), Location::new("W", 40.0, 64.0, 0.0));

        let report = manager.tick(t0(), &positions);

        assert_eq!(
            report.cancelled,
            vec![(SessionKey::new("HillA", alice()), CancelReason::ZoneExit)]
        );
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn tick_cancels_unlocatable_player_as_disconnect() {
        let (mut manager, _) = manager_with(vec![hill()]);
        manager.start_session("HillA", &alice(), t0()).unwrap();

        let report = manager.tick(t0(), &Positions::default());

        assert_eq!(report.cancelled[0].1, CancelReason::Disconnect);
    }

    #[test]
    fn tick_cancels_sessions_of_removed_points() {
        let zones = Arc::new(ZoneIndex::new(vec![hill()]).unwrap());
        let mut manager = CaptureSessionManager::new(zones.clone(), Arc::new(RecordingOutcome::default()));
        manager.start_session("HillA", &alice(), t0()).unwrap();

        zones.reload(Vec::new()).unwrap();
        let report = manager.tick(t0(), &Positions::default());

        assert_eq!(report.cancelled[0].1, CancelReason::AdminOverride);
    }

    #[test]
    fn tick_advances_progress_and_completes_at_threshold() {
        let mut point = hill();
        point.capture_ticks = 3;
        let (mut manager, outcome) = manager_with(vec![point]);
        manager.start_session("HillA", &alice(), t0()).unwrap();

        let mut positions = Positions::default();
        positions.0.insert(alice(), Location::new("W", 8.0, 64.0, 8.0));

        manager.tick(t0(), &positions);
        manager.tick(t0(), &positions);
        assert_eq!(manager.get("HillA", &alice()).unwrap().progress, 2);

        let report = manager.tick(t0(), &positions);
        assert_eq!(report.completed, vec![SessionKey::new("HillA", alice())]);
        assert_eq!(outcome.completed.lock().unwrap().len(), 1);
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn tick_flags_reinforcements_on_interval_until_cap() {
        let mut point = hill();
        point.reinforcement_interval = 2;
        point.max_reinforcements = 1;
        let (mut manager, _) = manager_with(vec![point]);
        manager.start_session("HillA", &alice(), t0()).unwrap();

        let mut positions = Positions::default();
        positions.0.insert(alice(), Location::new("W", 0.0, 64.0, 0.0));
        let key = SessionKey::new("HillA", alice());

        assert!(manager.tick(t0(), &positions).reinforcements_due.is_empty());
        assert_eq!(manager.tick(t0(), &positions).reinforcements_due, vec![key.clone()]);
        manager.record_reinforcement(&key);

        manager.tick(t0(), &positions);
        assert!(manager.tick(t0(), &positions).reinforcements_due.is_empty());
    }
}
