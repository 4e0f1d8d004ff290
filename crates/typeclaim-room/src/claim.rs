//! Claim resolution and final rankings.
//!
//! [`resolve_claim`] is the only place a territory's owner is written.
//! It takes `&mut` slices, so within one room it cannot interleave with
//! another claim; the room actor makes sure each room only ever has one
//! caller at a time.

use std::cmp::Ordering;

use typeclaim_protocol::{Player, PlayerId, Territory};

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The territory was unowned and now belongs to the claimant.
    Claimed,
    /// Someone got there first. Nothing changed.
    AlreadyOwned { owner: PlayerId },
    /// No territory with that id.
    UnknownTerritory,
    /// The claimant is not in the room.
    UnknownPlayer,
}

impl ClaimOutcome {
    /// `true` only for [`ClaimOutcome::Claimed`].
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed)
    }
}

/// Attempts to give `territory_id` to `player_id`.
///
/// On success the speed sample is recorded and the claimant's score is
/// recounted from ownership. Every other outcome leaves both slices
/// untouched.
pub fn resolve_claim(
    players: &mut [Player],
    territories: &mut [Territory],
    player_id: PlayerId,
    territory_id: &str,
    typing_speed: f64,
) -> ClaimOutcome {
    let Some(player) = players.iter_mut().find(|p| p.id == player_id) else {
        return ClaimOutcome::UnknownPlayer;
    };
    let Some(territory) = territories.iter_mut().find(|t| t.id == territory_id) else {
        return ClaimOutcome::UnknownTerritory;
    };

    // Check and set in one step.
    if let Some(owner) = territory.owner {
        return ClaimOutcome::AlreadyOwned { owner };
    }
    territory.owner = Some(player_id);

    record_typing_speed(player, typing_speed);
    player.score = owned_count(territories, player_id);
    ClaimOutcome::Claimed
}

/// Converts a client-reported speed into a stored sample.
///
/// Speeds are taken at face value, but NaN, infinities and negatives
/// become 0 and huge values saturate.
pub fn speed_sample(raw: f64) -> u32 {
    if raw.is_finite() && raw > 0.0 {
        raw.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Appends a sample and refreshes the rounded average.
pub fn record_typing_speed(player: &mut Player, raw: f64) {
    player.typing_speeds.push(speed_sample(raw));
    let total: u64 = player.typing_speeds.iter().map(|&s| u64::from(s)).sum();
    let mean = total as f64 / player.typing_speeds.len() as f64;
    player.avg_typing_speed = mean.round() as u32;
}

/// How many territories `player_id` owns.
pub fn owned_count(territories: &[Territory], player_id: PlayerId) -> u32 {
    territories
        .iter()
        .filter(|t| t.owner == Some(player_id))
        .count() as u32
}

/// `true` when every territory has an owner.
pub fn all_claimed(territories: &[Territory]) -> bool {
    !territories.is_empty() && territories.iter().all(Territory::is_claimed)
}

/// Final standings: score descending, then average speed descending.
///
/// The sort is stable, so players tied on both keys keep join order.
/// Every way a game can end uses this same order.
pub fn rank_players(players: &[Player]) -> Vec<Player> {
    let mut ranked = players.to_vec();
    ranked.sort_by(compare_standing);
    ranked
}

fn compare_standing(a: &Player, b: &Player) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.avg_typing_speed.cmp(&a.avg_typing_speed))
}
