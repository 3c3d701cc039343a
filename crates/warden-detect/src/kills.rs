use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use warden_core::{KillEvent, SuspicionStatus};

/// Window constants for the suspicion engine. The defaults were tuned
/// empirically on live servers; treat them as a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Max seconds between two kills for them to count as a double kill.
    pub double_kill_delay: u64,
    /// Seconds a completed double kill stays on record, measured from the
    /// pair's second kill to the newest kill seen.
    pub double_kill_decay_delay: u64,
    /// Double kills on record before a killer becomes kickable. Shouldn't
    /// change at the moment due to how baiting detection works.
    pub double_kill_count_tolerance: usize,
    /// Width of the sliding window used for spree detection.
    pub latest_kills_time_frame: u64,
    /// Kills within the window that count as a spree.
    pub latest_kills_count_tolerance: usize,
    /// Victim slots at or above this are world entities, not players.
    pub max_victim_slot: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            double_kill_delay: 3,
            double_kill_decay_delay: 300,
            double_kill_count_tolerance: 2,
            latest_kills_time_frame: 20,
            latest_kills_count_tolerance: 4,
            max_victim_slot: 40,
        }
    }
}

/// Baiting detection needs more players than this on the server.
/// Coincidental repeat-victim double kills are common in tiny games.
const BAITING_MIN_PLAYER_COUNT: u32 = 5;

/// How long the tracker stays undecided about a possible baiting case
/// before it gives up and judges on the residual evidence.
const BAITING_PROOF_WINDOW: u64 = 180;

/// Per-killer streaming state over that killer's kill events.
///
/// Feed it every kill attributed to the killer, in log order, via
/// [`add_kill`](Self::add_kill); read the classification back through
/// [`status`](Self::status). The tracker never panics and never errors:
/// malformed input (out-of-range victims, self kills) is ignored and
/// non-monotonic timestamps start a fresh epoch.
///
/// The baiting sub-state exists to avoid punishing a killer whose victim
/// keeps force-feeding themselves to get the killer flagged. Two double
/// kills sharing a victim put the tracker into a pending state; it then
/// waits for a third double kill, an ordinary spree, or a timeout before
/// concluding either way. Heuristic and unproven, by intent: a bounded
/// false-negative window beats an instant false-positive kick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillTracker {
    config: TrackerConfig,
    status: SuspicionStatus,
    baiter_ids: HashSet<u32>,
    /// 0 while not pending; otherwise the time ambiguity began.
    waiting_for_baiting_proof_since: u64,
    /// Completed double kills, ordered by their second kill.
    double_kills: Vec<[KillEvent; 2]>,
    /// A single kill waiting to see if a second one completes a pair.
    pending_kill: Option<KillEvent>,
    latest_kills: Vec<KillEvent>,
    /// Every victim this killer has killed. Advisory only for now;
    /// reserved for a reputable-kills extension.
    unique_victims: HashSet<u32>,
}

impl KillTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            status: SuspicionStatus::None,
            baiter_ids: HashSet::new(),
            waiting_for_baiting_proof_since: 0,
            double_kills: Vec::new(),
            pending_kill: None,
            latest_kills: Vec::new(),
            unique_victims: HashSet::new(),
        }
    }

    pub fn status(&self) -> SuspicionStatus {
        self.status
    }

    pub fn baiter_ids(&self) -> &HashSet<u32> {
        &self.baiter_ids
    }

    /// Snapshot of the recent-kills window, oldest first.
    pub fn latest_kills(&self) -> Vec<KillEvent> {
        self.latest_kills.clone()
    }

    pub fn unique_victims(&self) -> &HashSet<u32> {
        &self.unique_victims
    }

    /// Logs a kill and recomputes `status` and `baiter_ids`.
    ///
    /// `player_count` is the server population at the time of the kill;
    /// it gates the baiting heuristic.
    pub fn add_kill(&mut self, kill: KillEvent, player_count: u32) {
        if kill.victim_id >= self.config.max_victim_slot || kill.victim_id == kill.killer_id {
            // Only kills of other players count.
            return;
        }
        self.unique_victims.insert(kill.victim_id);
        self.update_double_kills(kill);
        self.update_latest_kills(kill);
        self.update_status(player_count);
    }

    /// Clears status and windows. A shallow reset keeps the half-formed
    /// double kill and the unique-victim history; a deep reset is for a
    /// player coming back under a new identity.
    pub fn reset(&mut self, shallow: bool) {
        self.status = SuspicionStatus::None;
        self.baiter_ids.clear();
        self.waiting_for_baiting_proof_since = 0;
        self.double_kills.clear();
        self.latest_kills.clear();
        if !shallow {
            self.pending_kill = None;
            self.unique_victims.clear();
        }
    }

    fn update_double_kills(&mut self, kill: KillEvent) {
        let Some(pending) = self.pending_kill else {
            self.pending_kill = Some(kill);
            return;
        };
        if kill.time < pending.time {
            // Time went backwards: log corruption or a round restart.
            // Start a new epoch rather than trusting the old record.
            self.pending_kill = Some(kill);
            self.double_kills.clear();
        } else if kill.time - pending.time <= self.config.double_kill_delay {
            self.double_kills.push([pending, kill]);
            self.pending_kill = None;
        } else {
            self.pending_kill = Some(kill);
        }
    }

    /// Needs `latest_kills` to be up to date.
    fn decay_double_kills(&mut self) {
        let Some(latest) = self.latest_kills.last().copied() else {
            return;
        };
        let horizon = self.config.double_kill_decay_delay;
        self.double_kills
            .retain(|pair| latest.time >= pair[1].time && latest.time - pair[1].time <= horizon);
    }

    fn update_latest_kills(&mut self, kill: KillEvent) {
        let cutoff = kill.time.saturating_sub(self.config.latest_kills_time_frame);
        self.latest_kills
            .retain(|k| k.time >= cutoff && k.time <= kill.time);
        self.latest_kills.push(kill);
    }

    /// Victim ids appearing in both double kills `a` and `b`.
    fn shared_victims(&self, a: usize, b: usize) -> Vec<u32> {
        let mut ids = Vec::new();
        for first in &self.double_kills[a] {
            for second in &self.double_kills[b] {
                if first.victim_id == second.victim_id && !ids.contains(&first.victim_id) {
                    ids.push(first.victim_id);
                }
            }
        }
        ids
    }

    fn update_status(&mut self, player_count: u32) {
        // Decay double kills only while not waiting for baiting proof.
        if self.waiting_for_baiting_proof_since == 0 {
            self.decay_double_kills();
        }
        let mut double_kill_count = self.double_kills.len();
        let latest_kill_count = self.latest_kills.len();

        if self.waiting_for_baiting_proof_since == 0 {
            if player_count > BAITING_MIN_PLAYER_COUNT && double_kill_count == 2 {
                let shared = self.shared_victims(0, 1);
                if let Some(&victim) = shared.first() {
                    // Could be baiting. Hold judgment until the double kills
                    // accumulate to three or a plain spree rules it out. The
                    // recent window is repurposed to track kills from here on.
                    if let Some(newest) = self.latest_kills.last().copied() {
                        self.waiting_for_baiting_proof_since = newest.time;
                        debug!(
                            killer = newest.killer_id,
                            victim, "possible baiting, holding judgment"
                        );
                    }
                    self.latest_kills.clear();
                    return;
                }
            }
        } else {
            let newest = self
                .latest_kills
                .last()
                .map(|k| k.time)
                .unwrap_or(self.waiting_for_baiting_proof_since);
            if newest.saturating_sub(self.waiting_for_baiting_proof_since) >= BAITING_PROOF_WINDOW {
                // Too ambiguous. Let go of the double kills under suspicion
                // and judge on whatever formed after the marker.
                let drop = double_kill_count.min(2);
                self.double_kills.drain(..drop);
                double_kill_count = self.double_kills.len();
                self.waiting_for_baiting_proof_since = 0;
            } else if latest_kill_count >= self.config.latest_kills_count_tolerance {
                // A rampage without the repeat-victim pattern. Judge as usual.
                self.waiting_for_baiting_proof_since = 0;
            } else if double_kill_count == 3 {
                // A third double kill arrived while we were waiting. If a
                // victim was involved in the first and the third, that victim
                // kept seeking this killer out.
                for victim in self.shared_victims(0, 2) {
                    self.baiter_ids.insert(victim);
                }
                if !self.baiter_ids.is_empty() {
                    self.status = SuspicionStatus::Baited;
                    self.waiting_for_baiting_proof_since = 0;
                    return;
                }
            } else {
                // Still ambiguous; keep waiting.
                return;
            }
        }

        // No indication of baiting: classify on the windows alone.
        self.status = if latest_kill_count >= self.config.latest_kills_count_tolerance {
            SuspicionStatus::Kickable
        } else if double_kill_count >= self.config.double_kill_count_tolerance {
            SuspicionStatus::Kickable
        } else if double_kill_count == 1 {
            SuspicionStatus::Suspected
        } else {
            SuspicionStatus::None
        };
    }
}

impl Default for KillTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kill(time: u64, victim_id: u32) -> KillEvent {
        KillEvent::new(time, 3, victim_id)
    }

    #[test]
    fn spaced_kills_stay_clear() {
        let mut tracker = KillTracker::default();
        for (i, t) in [0u64, 10, 20, 30, 40, 50].into_iter().enumerate() {
            tracker.add_kill(kill(t, 10 + i as u32), 4);
            assert_eq!(tracker.status(), SuspicionStatus::None);
        }
    }

    #[test]
    fn one_double_kill_is_suspected() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(10, 7), 4);
        assert_eq!(tracker.status(), SuspicionStatus::None);
        tracker.add_kill(kill(12, 9), 4);
        assert_eq!(tracker.status(), SuspicionStatus::Suspected);
        assert_eq!(tracker.latest_kills().len(), 2);
    }

    #[test]
    fn spree_is_kickable_regardless_of_spacing() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(0, 1), 4);
        tracker.add_kill(kill(5, 2), 4);
        tracker.add_kill(kill(10, 4), 4);
        assert_eq!(tracker.status(), SuspicionStatus::None);
        tracker.add_kill(kill(15, 5), 4);
        assert_eq!(tracker.status(), SuspicionStatus::Kickable);
    }

    #[test]
    fn two_double_kills_distinct_victims_are_kickable() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(0, 1), 10);
        tracker.add_kill(kill(2, 2), 10);
        tracker.add_kill(kill(50, 4), 10);
        tracker.add_kill(kill(52, 5), 10);
        assert_eq!(tracker.status(), SuspicionStatus::Kickable);
    }

    #[test]
    fn self_kills_and_world_victims_are_ignored() {
        let mut tracker = KillTracker::default();
        for t in 0..10 {
            tracker.add_kill(KillEvent::new(t, 3, 3), 10);
            tracker.add_kill(KillEvent::new(t, 3, 40), 10);
        }
        assert_eq!(tracker.status(), SuspicionStatus::None);
        assert!(tracker.latest_kills().is_empty());
        assert!(tracker.unique_victims().is_empty());
    }

    #[test]
    fn shared_victim_double_kills_enter_pending_state() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(10, 7), 10);
        tracker.add_kill(kill(12, 9), 10);
        assert_eq!(tracker.status(), SuspicionStatus::Suspected);
        tracker.add_kill(kill(50, 7), 10);
        tracker.add_kill(kill(52, 9), 10);
        // Status carries over unchanged while the tracker waits for proof,
        // and the recent window restarts from this point.
        assert_eq!(tracker.status(), SuspicionStatus::Suspected);
        assert_eq!(tracker.waiting_for_baiting_proof_since, 52);
        assert!(tracker.latest_kills().is_empty());
    }

    #[test]
    fn small_population_never_enters_pending_state() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(10, 7), 5);
        tracker.add_kill(kill(12, 9), 5);
        tracker.add_kill(kill(50, 7), 5);
        tracker.add_kill(kill(52, 9), 5);
        assert_eq!(tracker.status(), SuspicionStatus::Kickable);
        assert_eq!(tracker.waiting_for_baiting_proof_since, 0);
    }

    #[test]
    fn third_double_kill_with_shared_victim_confirms_baiting() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(10, 7), 10);
        tracker.add_kill(kill(12, 9), 10);
        tracker.add_kill(kill(50, 7), 10);
        tracker.add_kill(kill(52, 9), 10);
        tracker.add_kill(kill(150, 7), 10);
        tracker.add_kill(kill(152, 2), 10);
        assert_eq!(tracker.status(), SuspicionStatus::Baited);
        assert!(tracker.baiter_ids().contains(&7));
        assert_eq!(tracker.waiting_for_baiting_proof_since, 0);
    }

    #[test]
    fn third_double_kill_without_shared_victim_is_judged_normally() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(10, 7), 10);
        tracker.add_kill(kill(12, 9), 10);
        tracker.add_kill(kill(50, 7), 10);
        tracker.add_kill(kill(52, 9), 10);
        tracker.add_kill(kill(150, 1), 10);
        tracker.add_kill(kill(152, 2), 10);
        // Three double kills on record and no baiting proof.
        assert_eq!(tracker.status(), SuspicionStatus::Kickable);
        assert!(tracker.baiter_ids().is_empty());
    }

    #[test]
    fn pending_state_times_out_to_residual_evidence() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(10, 7), 10);
        tracker.add_kill(kill(12, 9), 10);
        tracker.add_kill(kill(50, 7), 10);
        tracker.add_kill(kill(52, 9), 10);
        // One stray kill three minutes later: the old double kills are
        // dropped and the lone kill classifies as nothing.
        tracker.add_kill(kill(300, 5), 10);
        assert_eq!(tracker.status(), SuspicionStatus::None);
        assert_eq!(tracker.waiting_for_baiting_proof_since, 0);
        assert!(tracker.double_kills.is_empty());
    }

    #[test]
    fn spree_while_pending_resolves_to_normal_judgment() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(10, 7), 10);
        tracker.add_kill(kill(12, 9), 10);
        tracker.add_kill(kill(50, 7), 10);
        tracker.add_kill(kill(52, 9), 10);
        for (i, t) in [60u64, 70, 75, 80].into_iter().enumerate() {
            tracker.add_kill(kill(t, 20 + i as u32), 10);
        }
        // Rampage without the repeat-victim pattern: pending clears and the
        // accumulated double kills count as usual.
        assert_eq!(tracker.status(), SuspicionStatus::Kickable);
        assert_eq!(tracker.waiting_for_baiting_proof_since, 0);
    }

    #[test]
    fn non_monotonic_time_starts_a_new_epoch() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(100, 1), 4);
        tracker.add_kill(kill(102, 2), 4);
        assert_eq!(tracker.status(), SuspicionStatus::Suspected);
        tracker.add_kill(kill(50, 4), 4);
        assert_eq!(tracker.status(), SuspicionStatus::None);
        tracker.add_kill(kill(51, 5), 4);
        assert_eq!(tracker.status(), SuspicionStatus::Suspected);
        assert_eq!(tracker.double_kills.len(), 1);
    }

    #[test]
    fn double_kills_decay_after_the_horizon() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(0, 1), 4);
        tracker.add_kill(kill(2, 2), 4);
        assert_eq!(tracker.status(), SuspicionStatus::Suspected);
        tracker.add_kill(kill(310, 4), 4);
        assert_eq!(tracker.status(), SuspicionStatus::None);
    }

    #[test]
    fn shallow_reset_keeps_the_half_formed_double_kill() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(0, 1), 4);
        tracker.add_kill(kill(2, 2), 4);
        tracker.add_kill(kill(100, 4), 4);
        tracker.reset(true);
        assert_eq!(tracker.status(), SuspicionStatus::None);
        // The kill at t=100 is still pending and completes a pair.
        tracker.add_kill(kill(101, 5), 4);
        assert_eq!(tracker.status(), SuspicionStatus::Suspected);
        assert!(tracker.unique_victims().contains(&1));
    }

    #[test]
    fn deep_reset_forgets_everything() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(0, 1), 4);
        tracker.add_kill(kill(100, 4), 4);
        tracker.reset(false);
        tracker.add_kill(kill(101, 5), 4);
        assert_eq!(tracker.status(), SuspicionStatus::None);
        assert_eq!(tracker.unique_victims().len(), 1);
    }

    #[test]
    fn serialization_round_trip_is_lossless() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(10, 7), 10);
        tracker.add_kill(kill(12, 9), 10);
        tracker.add_kill(kill(50, 7), 10);
        tracker.add_kill(kill(52, 9), 10);

        let json = serde_json::to_string(&tracker).unwrap();
        let restored: KillTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.status(), tracker.status());
        assert_eq!(restored.latest_kills(), tracker.latest_kills());
        assert_eq!(
            restored.waiting_for_baiting_proof_since,
            tracker.waiting_for_baiting_proof_since
        );
    }

    #[test]
    fn latest_kills_returns_a_snapshot() {
        let mut tracker = KillTracker::default();
        tracker.add_kill(kill(0, 1), 4);
        let mut snapshot = tracker.latest_kills();
        snapshot.clear();
        assert_eq!(tracker.latest_kills().len(), 1);
    }
}
