pub mod plan;
pub mod reports;
pub mod simulator;
pub mod tester;

pub use plan::{SimulationPlan, SimulationSummary};
pub use simulator::CaravanSimulator;
pub use tester::*;
