//! Stage sequencing.
//!
//! Each stage reads only the artifact of the stage before it, so stages can
//! be run one at a time or all in order.

use std::fmt;
use std::time::Instant;

use crate::clean::{CleanSummary, run_cleaner};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::marts::{MartSummary, VIEWS, run_mart_builder};
use crate::profile::{ProfileArtifacts, run_profiler};
use crate::warehouse::{LoadSummary, run_loader};

/// A batch stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Profile,
    Clean,
    Load,
    Marts,
}

impl Stage {
    /// Every stage, in run order
    pub const ALL: [Self; 4] = [Self::Profile, Self::Clean, Self::Load, Self::Marts];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Clean => "clean",
            Self::Load => "load",
            Self::Marts => "marts",
        }
    }

    /// Run this stage against the project described by `config`
    pub fn run(self, config: &PipelineConfig) -> Result<StageReport> {
        let start = Instant::now();
        log::info!("Running stage {}", self.name());
        let report = match self {
            Self::Profile => StageReport::Profile(run_profiler(config)?),
            Self::Clean => StageReport::Clean(run_cleaner(config)?),
            Self::Load => StageReport::Load(run_loader(config)?),
            Self::Marts => StageReport::Marts(run_mart_builder(config)?),
        };
        log::info!("Stage {} finished in {:?}", self.name(), start.elapsed());
        Ok(report)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageReport {
    Profile(ProfileArtifacts),
    Clean(CleanSummary),
    Load(LoadSummary),
    Marts(MartSummary),
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile(p) => write!(
                f,
                "profile written to {} and {}",
                p.profile_csv.display(),
                p.report_md.display()
            ),
            Self::Clean(c) => write!(
                f,
                "{} rows x {} columns written to {} (PII dropped: {})",
                c.rows,
                c.columns,
                c.clean_path.display(),
                c.dropped_pii.len()
            ),
            Self::Load(l) => write!(f, "{} rows loaded into {}", l.rows, l.warehouse_path.display()),
            Self::Marts(m) => write!(
                f,
                "{} views rebuilt in {}",
                VIEWS.len(),
                m.warehouse_path.display()
            ),
        }
    }
}

/// Run every stage in order, stopping at the first failure
pub fn run_all(config: &PipelineConfig) -> Result<Vec<StageReport>> {
    Stage::ALL.iter().map(|stage| stage.run(config)).collect()
}
