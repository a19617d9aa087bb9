//! Progress scheduler: one externally clocked pass over every live caravan.
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::caravan::{Caravan, CaravanStatus};
use crate::config::PathConfig;
use crate::constants::{LOG_TARGET_SCHEDULER, PROGRESS_COMPLETE_PERCENT};
use crate::ids::CaravanId;
use crate::registry::CaravanRegistry;

/// What a single tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Caravans that moved forward this tick (including ones that arrived).
    pub advanced: Vec<CaravanId>,
    /// Caravans that reached 100% this tick.
    pub arrived: Vec<CaravanId>,
    /// Destroyed caravans whose grace period ran out and were removed.
    pub expired: Vec<CaravanId>,
}

impl TickReport {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.advanced.is_empty() && self.expired.is_empty()
    }
}

/// Advance one caravan by `step` points. Returns `None` when it is not moving.
pub fn advance(caravan: &mut Caravan, step: f64, path: &PathConfig) -> Option<CaravanStatus> {
    if caravan.status != CaravanStatus::Traveling || caravan.is_under_attack {
        return None;
    }
    caravan.progress_percent = (caravan.progress_percent + step).min(PROGRESS_COMPLETE_PERCENT);
    caravan.position = path.position_at(caravan.progress_percent);
    if caravan.progress_percent >= PROGRESS_COMPLETE_PERCENT {
        caravan.transition(CaravanStatus::Arrived);
    }
    Some(caravan.status)
}

/// Whether a destroyed caravan's grace period has run out.
#[must_use]
pub fn is_expired(caravan: &Caravan, now: DateTime<Utc>) -> bool {
    caravan.status == CaravanStatus::Destroyed
        && caravan.remove_after.is_some_and(|deadline| deadline <= now)
}

impl CaravanRegistry {
    /// Run one scheduler step.
    ///
    /// Every traveling caravan not under attack advances by the configured
    /// step and turns `arrived` at 100%. Destroyed caravans past their
    /// expiry are removed in the same pass. There is no internal timer: the
    /// caller owns the cadence.
    pub fn tick(&self) -> TickReport {
        let now = self.now();
        let step = self.config().progress_step;
        let path = self.config().path;
        let mut report = TickReport::default();

        let mut caravans = self.write();
        for caravan in caravans.iter_mut() {
            if let Some(status) = advance(caravan, step, &path) {
                report.advanced.push(caravan.id);
                if status == CaravanStatus::Arrived {
                    report.arrived.push(caravan.id);
                }
            }
        }
        caravans.retain(|caravan| {
            if is_expired(caravan, now) {
                report.expired.push(caravan.id);
                false
            } else {
                true
            }
        });
        drop(caravans);

        for id in &report.arrived {
            info!(target: LOG_TARGET_SCHEDULER, "caravan {id} arrived");
        }
        for id in &report.expired {
            debug!(target: LOG_TARGET_SCHEDULER, "destroyed caravan {id} removed");
        }
        report
    }
}
