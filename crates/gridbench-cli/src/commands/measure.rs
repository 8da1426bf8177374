use std::error::Error;

use gridbench_exp::{to_canonical_json_bytes, Harness, HarnessConfig};

use super::{invoker, OutputFormat};

pub fn run(config: &HarnessConfig, trials: u32, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    let harness = Harness::new(invoker(config)?, config.extract, trials);
    let result = harness.measure(&config.measure_point())?;
    match format {
        OutputFormat::Table => match result.mean {
            Some(mean) => println!("{mean}"),
            None => println!("no data"),
        },
        OutputFormat::Json => {
            let json = to_canonical_json_bytes(&result)?;
            println!("{}", String::from_utf8(json)?);
        }
    }
    Ok(())
}
