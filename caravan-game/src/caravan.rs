//! The caravan aggregate and its guard entries.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::catalog::{CaravanRoute, CaravanType};
use crate::constants::BPS_DENOM;
use crate::ids::{CaravanId, GuardId, PlayerId};

/// Lifecycle status of a caravan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaravanStatus {
    Preparing,
    Traveling,
    UnderAttack,
    Arrived,
    Destroyed,
}

impl CaravanStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Traveling => "traveling",
            Self::UnderAttack => "under_attack",
            Self::Arrived => "arrived",
            Self::Destroyed => "destroyed",
        }
    }

    /// Statuses listed by `active_list`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Preparing | Self::Traveling | Self::UnderAttack)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Arrived | Self::Destroyed)
    }

    /// Guards may enlist only before departure or while on the road.
    #[must_use]
    pub const fn accepts_guards(self) -> bool {
        matches!(self, Self::Preparing | Self::Traveling)
    }

    /// Edges of the lifecycle graph.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Preparing, Self::Traveling)
                | (Self::Traveling, Self::UnderAttack | Self::Arrived)
                | (Self::UnderAttack, Self::Traveling | Self::Destroyed)
        )
    }
}

impl fmt::Display for CaravanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enlistment state of a guard. Entries are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardStatus {
    Active,
    Dead,
    Left,
}

/// A point in map space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Owner identity captured when the caravan was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: PlayerId,
    pub name: String,
    pub level: u32,
}

impl Owner {
    #[must_use]
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, level: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level,
        }
    }
}

/// Identity snapshot of a player volunteering to guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardCandidate {
    pub player_id: PlayerId,
    pub name: String,
    pub level: u32,
    pub class: String,
}

impl GuardCandidate {
    #[must_use]
    pub fn new(
        player_id: impl Into<PlayerId>,
        name: impl Into<String>,
        level: u32,
        class: impl Into<String>,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            name: name.into(),
            level,
            class: class.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guard {
    pub id: GuardId,
    pub player_id: PlayerId,
    pub name: String,
    pub level: u32,
    pub class: String,
    pub status: GuardStatus,
    /// Promised share of the final payout, in basis points.
    pub share_bps: u32,
    pub joined_at: DateTime<Utc>,
}

impl Guard {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, GuardStatus::Active)
    }

    /// Share of the payout as a fraction (0.10 for the reference 10%).
    #[must_use]
    pub fn reward_share(&self) -> f64 {
        f64::from(self.share_bps) / f64::from(BPS_DENOM)
    }
}

/// Guards are short lists; most caravans fit inline.
pub type GuardRoster = SmallVec<[Guard; 4]>;

/// The aggregate root: one player's caravan on one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caravan {
    pub id: CaravanId,
    pub owner: Owner,
    pub caravan_type: CaravanType,
    pub route: CaravanRoute,
    pub status: CaravanStatus,
    pub progress_percent: f64,
    pub position: Position,
    /// Gold committed beyond the type's base cost.
    pub investment: u64,
    /// `base_cost + investment`, debited from the owner's wallet.
    pub total_cost: u64,
    pub cargo_value: u64,
    pub potential_reward: u64,
    pub guards: GuardRoster,
    pub max_guards: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub is_under_attack: bool,
    pub times_attacked: u32,
    pub last_attacker: Option<PlayerId>,
    /// Set on destruction; the scheduler removes the caravan once this passes.
    pub remove_after: Option<DateTime<Utc>>,
}

impl Caravan {
    pub fn active_guards(&self) -> impl Iterator<Item = &Guard> {
        self.guards.iter().filter(|guard| guard.is_active())
    }

    #[must_use]
    pub fn active_guard_count(&self) -> u32 {
        u32::try_from(self.active_guards().count()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn open_guard_slots(&self) -> u32 {
        self.max_guards.saturating_sub(self.active_guard_count())
    }

    /// Whether the active roster meets the type's recommended minimum.
    #[must_use]
    pub fn meets_min_guards(&self) -> bool {
        self.active_guard_count() >= self.caravan_type.min_guards
    }

    #[must_use]
    pub fn is_owned_by(&self, player: &PlayerId) -> bool {
        &self.owner.id == player
    }

    #[must_use]
    pub fn is_guarded_by(&self, player: &PlayerId) -> bool {
        self.active_guards().any(|guard| &guard.player_id == player)
    }

    /// Move along the lifecycle graph, refusing edges that do not exist.
    pub(crate) fn transition(&mut self, next: CaravanStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }
}
