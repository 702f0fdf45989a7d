//! Report generation port trait.

use crate::domain::batch::BatchReport;
use crate::domain::error::RoundtripError;
use std::path::Path;

/// Port for presenting analysis results. Implementations only read the
/// report.
pub trait ReportPort {
    fn write(&self, report: &BatchReport, output_dir: &Path) -> Result<(), RoundtripError>;
}
