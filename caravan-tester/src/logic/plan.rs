use anyhow::Result;
use std::sync::Arc;

/// Declarative plan for one convoy simulation.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    /// Caravans opened at the start of the run.
    pub caravans: usize,
    /// Fixed caravan type; `None` picks one per caravan from the catalog.
    pub type_id: Option<u32>,
    /// Fixed route; `None` picks one per caravan from the catalog.
    pub route_id: Option<u32>,
    pub investment: u64,
    /// Guard candidates that try to enlist on each caravan before departure.
    pub guard_candidates: usize,
    /// Chance per tick, in basis points, that a traveling caravan is raided.
    pub raid_chance_bps: u32,
    /// Raiders racing to strike the same caravan in one wave.
    pub raiders_per_wave: usize,
    /// Chance in basis points that guarded defenders win a raid.
    pub defender_win_bps: u32,
    /// Chance in basis points that a won defense costs one guard.
    pub casualty_bps: u32,
    pub max_ticks: u32,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(caravans: usize) -> Self {
        Self {
            caravans,
            type_id: None,
            route_id: None,
            investment: 1_000,
            guard_candidates: 0,
            raid_chance_bps: 0,
            raiders_per_wave: 1,
            defender_win_bps: 0,
            casualty_bps: 0,
            max_ticks: 200,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_caravan(mut self, type_id: u32, route_id: u32) -> Self {
        self.type_id = Some(type_id);
        self.route_id = Some(route_id);
        self
    }

    #[must_use]
    pub const fn with_investment(mut self, investment: u64) -> Self {
        self.investment = investment;
        self
    }

    #[must_use]
    pub const fn with_guard_candidates(mut self, candidates: usize) -> Self {
        self.guard_candidates = candidates;
        self
    }

    #[must_use]
    pub const fn with_raids(mut self, chance_bps: u32, raiders_per_wave: usize) -> Self {
        self.raid_chance_bps = chance_bps;
        self.raiders_per_wave = raiders_per_wave;
        self
    }

    #[must_use]
    pub const fn with_defense(mut self, win_bps: u32, casualty_bps: u32) -> Self {
        self.defender_win_bps = win_bps;
        self.casualty_bps = casualty_bps;
        self
    }

    #[must_use]
    pub const fn with_max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    pub seed: u64,
    pub ticks: u32,
    pub caravans_created: usize,
    pub funding_rejections: usize,
    pub gold_invested: u64,
    pub guards_joined: usize,
    pub guard_rejections: usize,
    /// Largest active roster seen on any caravan, paired with its cap.
    pub peak_roster: (u32, u32),
    pub raid_waves: usize,
    pub attacks_started: usize,
    pub attacks_rejected: usize,
    pub raids_repelled: usize,
    pub raids_looted: usize,
    pub guards_fallen: usize,
    pub arrivals: usize,
    pub completed: usize,
    pub expired: usize,
    pub gold_paid: i64,
    pub karma_granted: i64,
    /// Sum of `potential_reward` over completed caravans.
    pub reward_pool: u64,
    /// Caravans still in the registry when the run stopped.
    pub remaining: usize,
    pub invariant_violations: Vec<String>,
}

impl SimulationSummary {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "seed {} ticks {} created {} arrived {} looted {} expired {} paid {} karma {} violations {}",
            self.seed,
            self.ticks,
            self.caravans_created,
            self.arrivals,
            self.raids_looted,
            self.expired,
            self.gold_paid,
            self.karma_granted,
            self.invariant_violations.len()
        )
    }
}
