mod attempt;
mod history;
mod side;

pub use attempt::{DeployAttempt, DeployStatus};
pub use history::{DateRange, DeployStatistics, HistoryPage, HistoryQuery, history_order};
pub use side::{DeploySide, Face};
