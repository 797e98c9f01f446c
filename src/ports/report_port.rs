//! Report generation port trait.

use crate::domain::error::ReplayError;
use crate::domain::portfolio::Account;

/// Port for writing the outcome of a replay.
pub trait ReportPort {
    fn write(&self, account: &Account, output_path: &str) -> Result<(), ReplayError>;
}
