use crate::application::runner::ScenarioRun;
use crate::error::Result;
use std::io::Write;

/// Writes one CSV row per step of a scenario run, including steps not yet attempted.
pub struct RunReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RunReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_run(&mut self, run: &ScenarioRun) -> Result<()> {
        self.writer
            .write_record(["step", "kind", "description", "outcome", "tx_hash", "error"])?;
        for (index, step) in run.scenario().steps.iter().enumerate() {
            let result = run.result(index);
            let outcome = match result {
                Some(r) if r.success => "ok",
                Some(_) => "failed",
                None => "skipped",
            };
            let position = (index + 1).to_string();
            self.writer.write_record([
                position.as_str(),
                step.kind.as_str(),
                step.description.as_str(),
                outcome,
                result.and_then(|r| r.tx_hash.as_deref()).unwrap_or(""),
                result.and_then(|r| r.error.as_deref()).unwrap_or(""),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scenario::{self, PacingSpeed, SIMPLE_PAYMENT};

    #[test]
    fn test_unattempted_steps_are_skipped() {
        let run = ScenarioRun::new(scenario::find(SIMPLE_PAYMENT).unwrap(), PacingSpeed::Fast);

        let mut out = Vec::new();
        RunReportWriter::new(&mut out).write_run(&run).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("1,deposit,Deposit funds into escrow,skipped,,"));
    }
}
