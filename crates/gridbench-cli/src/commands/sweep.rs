use std::error::Error;
use std::io::{self, Write};

use gridbench_exp::{to_canonical_json_bytes, Harness, HarnessConfig, SweepReport, TableWriter};

use super::{invoker, write_error, OutputFormat};

pub fn run(config: &HarnessConfig, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    let harness = Harness::new(invoker(config)?, config.extract, config.trials);
    let sweep = config.sweep()?;
    match format {
        OutputFormat::Table => {
            let reporter = config.reporter()?;
            let mut writer = TableWriter::new(&reporter, io::stdout().lock());
            let outcome =
                harness.run_sweep(&sweep, |result| writer.push(result).map_err(write_error))?;
            let mut out = writer.finish()?;
            writeln!(
                out,
                "# failed trials: {} of {}",
                outcome.failed_trials, outcome.total_trials
            )?;
        }
        OutputFormat::Json => {
            let outcome = harness.run_sweep(&sweep, |_| Ok(()))?;
            let report = SweepReport::new(config, outcome)?;
            let json = to_canonical_json_bytes(&report)?;
            println!("{}", String::from_utf8(json)?);
        }
    }
    Ok(())
}
