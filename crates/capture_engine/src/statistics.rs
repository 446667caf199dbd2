//! # Zone Combat Statistics
//!
//! Attributes kills to the capture zone they happened in. The aggregator holds
//! no session awareness: every decision is a function of the kill event and
//! the zone index.
//!
//! | Victim | Killer | Recorded |
//! |--------|--------|----------|
//! | player | player | player kill for the killer, death for the victim |
//! | mob    | player | mob kill for the killer |
//! | any    | none / non-player | nothing |
//!
//! Kills outside every capture and buffer ring are ignored.

use crate::types::{Location, PlayerId};
use crate::zone::ZoneIndex;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A combatant involved in a kill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub is_player: bool,
}

impl Combatant {
    pub fn player(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_player: true,
        }
    }

    pub fn mob(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_player: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillKind {
    PlayerKill,
    MobKill,
}

/// One attributed kill, handed straight to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillRecord {
    pub kind: KillKind,
    pub zone_id: String,
    pub killer: PlayerId,
    /// Victim id; a player id for player kills, an entity id for mob kills
    pub victim: String,
    pub at: DateTime<Utc>,
}

/// Destination for attributed kills.
pub trait StatisticsSink: Send + Sync {
    fn record(&self, record: &KillRecord);
}

/// Per-player counters inside one zone.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePlayerStats {
    pub player_kills: u64,
    pub mob_kills: u64,
    pub deaths: u64,
}

/// In-memory sink keyed by `(zone, player)`.
///
/// Readable from other tasks while the engine keeps recording.
#[derive(Debug, Default)]
pub struct ZoneStatistics {
    counters: DashMap<(String, PlayerId), ZonePlayerStats>,
}

impl ZoneStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, zone_id: &str, player: &PlayerId) -> ZonePlayerStats {
        self.counters
            .get(&(zone_id.to_string(), player.clone()))
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// Totals for one zone across all players.
    pub fn zone_totals(&self, zone_id: &str) -> ZonePlayerStats {
        self.counters
            .iter()
            .filter(|entry| entry.key().0 == zone_id)
            .fold(ZonePlayerStats::default(), |mut acc, entry| {
                acc.player_kills += entry.player_kills;
                acc.mob_kills += entry.mob_kills;
                acc.deaths += entry.deaths;
                acc
            })
    }

    /// Players in a zone ordered by total kills, highest first.
    pub fn leaderboard(&self, zone_id: &str) -> Vec<(PlayerId, ZonePlayerStats)> {
        let mut rows: Vec<(PlayerId, ZonePlayerStats)> = self
            .counters
            .iter()
            .filter(|entry| entry.key().0 == zone_id)
            .map(|entry| (entry.key().1.clone(), *entry.value()))
            .collect();
        rows.sort_by(|a, b| {
            let total = |s: &ZonePlayerStats| s.player_kills + s.mob_kills;
            total(&b.1).cmp(&total(&a.1)).then_with(|| a.0.cmp(&b.0))
        });
        rows
    }

    pub fn total_records(&self) -> u64 {
        self.counters
            .iter()
            .map(|entry| entry.player_kills + entry.mob_kills)
            .sum()
    }
}

impl StatisticsSink for ZoneStatistics {
    fn record(&self, record: &KillRecord) {
        self.counters
            .entry((record.zone_id.clone(), record.killer.clone()))
            .and_modify(|stats| match record.kind {
                KillKind::PlayerKill => stats.player_kills += 1,
                KillKind::MobKill => stats.mob_kills += 1,
            })
            .or_insert_with(|| match record.kind {
                KillKind::PlayerKill => ZonePlayerStats { player_kills: 1, ..Default::default() },
                KillKind::MobKill => ZonePlayerStats { mob_kills: 1, ..Default::default() },
            });

        if record.kind == KillKind::PlayerKill {
            self.counters
                .entry((record.zone_id.clone(), PlayerId::from(record.victim.as_str())))
                .or_default()
                .deaths += 1;
        }
    }
}

/// Resolves kills to zones and forwards them to the sink.
pub struct StatisticsAggregator {
    zones: Arc<ZoneIndex>,
    sink: Arc<dyn StatisticsSink>,
}

impl StatisticsAggregator {
    pub fn new(zones: Arc<ZoneIndex>, sink: Arc<dyn StatisticsSink>) -> Self {
        Self { zones, sink }
    }

    /// Attributes one kill. Returns the record handed to the sink, if any.
    pub fn on_kill(
        &self,
        victim: &Combatant,
        killer: Option<&Combatant>,
        location: &Location,
        at: DateTime<Utc>,
    ) -> Option<KillRecord> {
        let killer = killer.filter(|k| k.is_player)?;
        let zone = self.zones.find_containing(location)?;

        let kind = if victim.is_player {
            KillKind::PlayerKill
        } else {
            KillKind::MobKill
        };
        let record = KillRecord {
            kind,
            zone_id: zone.point.id.clone(),
            killer: PlayerId::from(killer.id.as_str()),
            victim: victim.id.clone(),
            at,
        };

        debug!(
            "⚔️ {:?} in '{}': {} killed {}",
            kind, record.zone_id, record.killer, record.victim
        );
        self.sink.record(&record);
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use crate::zone::CapturePoint;
    use chrono::TimeZone;

    fn setup() -> (StatisticsAggregator, Arc<ZoneStatistics>) {
        let point = CapturePoint::new("HillA", "W", Position::new(0.0, 0.0, 0.0), 2);
        let zones = Arc::new(ZoneIndex::new(vec![point]).unwrap());
        let stats = Arc::new(ZoneStatistics::new());
        (StatisticsAggregator::new(zones, stats.clone()), stats)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn inside() -> Location {
        Location::new("W", 8.0, 64.0, 8.0)
    }

    #[test]
    fn mob_kill_in_zone_is_credited_to_killer() {
        let (aggregator, stats) = setup();

        let record = aggregator
            .on_kill(&Combatant::mob("zombie#12"), Some(&Combatant::player("bob")), &inside(), now())
            .unwrap();

        assert_eq!(record.kind, KillKind::MobKill);
        assert_eq!(record.zone_id, "HillA");
        assert_eq!(stats.get("HillA", &PlayerId::from("bob")).mob_kills, 1);
    }

    #[test]
    fn kill_outside_every_zone_is_ignored() {
        let (aggregator, stats) = setup();
        let far = Location::new("W", 1600.0, 64.0, 0.0);

        assert!(aggregator
            .on_kill(&Combatant::mob("zombie#12"), Some(&Combatant::player("bob")), &far, now())
            .is_none());
        assert_eq!(stats.total_records(), 0);
    }

    #[test]
    fn pvp_kill_counts_kill_and_death() {
        let (aggregator, stats) = setup();

        aggregator.on_kill(&Combatant::player("alice"), Some(&Combatant::player("bob")), &inside(), now());

        assert_eq!(stats.get("HillA", &PlayerId::from("bob")).player_kills, 1);
        assert_eq!(stats.get("HillA", &PlayerId::from("alice")).deaths, 1);
        assert_eq!(stats.zone_totals("HillA").player_kills, 1);
    }

    #[test]
    fn kills_without_player_killer_are_ignored() {
        let (aggregator, stats) = setup();

        assert!(aggregator.on_kill(&Combatant::player("alice"), None, &inside(), now()).is_none());
        assert!(aggregator
            .on_kill(&Combatant::player("alice"), Some(&Combatant::mob("creeper#3")), &inside(), now())
            .is_none());
        assert_eq!(stats.total_records(), 0);
    }

    #[test]
    fn leaderboard_orders_by_total_kills() {
        let (aggregator, stats) = setup();
        let bob = Combatant::player("bob");
        let carol = Combatant::player("carol");

        aggregator.on_kill(&Combatant::mob("m1"), Some(&carol), &inside(), now());
        aggregator.on_kill(&Combatant::mob("m2"), Some(&bob), &inside(), now());
        aggregator.on_kill(&Combatant::player("dave"), Some(&bob), &inside(), now());

        let board = stats.leaderboard("HillA");
        assert_eq!(board[0].0, PlayerId::from("bob"));
        assert_eq!(board[1].0, PlayerId::from("carol"));
    }
}
