use std::io::Write;

use crate::config::PLATFORM_DOMAIN;
use crate::model::{PolicyRecord, RetrievalResult, Service};

const RULE_WIDTH: usize = 60;
const TITLE: &str = "CyberArk SCA & SIA Policy Retriever";

/// Number of progress stages shown while the run is in flight.
pub const STAGES: usize = 3;

/// Policy counts for the closing line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub sca: usize,
    pub sia: usize,
}

impl Summary {
    pub fn from_results(results: &[RetrievalResult]) -> Self {
        results.iter().fold(Summary::default(), |mut acc, r| {
            match r.service {
                Service::Sca => acc.sca += r.count(),
                Service::Sia => acc.sia += r.count(),
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.sca + self.sia
    }

    pub fn line(&self) -> String {
        format!(
            "TOTAL: {} SCA + {} SIA = {} policies",
            self.sca,
            self.sia,
            self.total()
        )
    }
}

/// Writes the human-readable report
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Reporter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn rule(&mut self) -> std::io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))
    }

    pub fn banner(&mut self) -> std::io::Result<()> {
        self.rule()?;
        writeln!(self.out, "{}", TITLE)?;
        self.rule()
    }

    pub fn blank_line(&mut self) -> std::io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }

    /// `[n/3] <label>...`
    pub fn stage(&mut self, step: usize, label: &str) -> std::io::Result<()> {
        writeln!(self.out, "[{}/{}] {}...", step, STAGES, label)?;
        self.out.flush()
    }

    pub fn stage_ok(&mut self, detail: &str) -> std::io::Result<()> {
        writeln!(self.out, "      ✓ {}", detail)
    }

    pub fn stage_failed(&mut self, detail: &str) -> std::io::Result<()> {
        writeln!(self.out, "      ✗ {}", detail)
    }

    /// Header plus one block per policy, or an error block.
    pub fn section(&mut self, result: &RetrievalResult) -> std::io::Result<()> {
        writeln!(self.out)?;
        self.rule()?;
        writeln!(
            self.out,
            "{} POLICIES ({}.{})",
            result.service.tag(),
            result.service.host_label(),
            PLATFORM_DOMAIN
        )?;
        self.rule()?;

        if let Some(error) = &result.error {
            writeln!(
                self.out,
                "\n  [ERROR] Could not retrieve {} policies: {}",
                result.service.tag(),
                error
            )?;
            return Ok(());
        }

        if result.records.is_empty() {
            writeln!(self.out, "\n  No policies found.")?;
            return Ok(());
        }

        for record in &result.records {
            self.record(record)?;
        }

        // Later pages are not requested
        if let Some(total) = result.reported_total {
            if total > result.count() as u64 {
                writeln!(
                    self.out,
                    "\n  Showing {} of {} policies reported by the service.",
                    result.count(),
                    total
                )?;
            }
        }

        Ok(())
    }

    fn record(&mut self, record: &PolicyRecord) -> std::io::Result<()> {
        writeln!(self.out, "\n  Name:        {}", record.name)?;
        writeln!(self.out, "  Description: {}", record.description())?;
        writeln!(self.out, "  Status:      {}", record.status)?;
        writeln!(self.out, "  Policy ID:   {}", record.id)
    }

    pub fn summary(&mut self, summary: &Summary) -> std::io::Result<()> {
        writeln!(self.out)?;
        self.rule()?;
        writeln!(self.out, "{}", summary.line())?;
        self.rule()?;
        self.out.flush()
    }
}
