//! Convert command implementation.

use anyhow::{Context, Result};
use trading_data::convert_json_file;

use crate::cli::ConvertArgs;

pub fn run(args: ConvertArgs) -> Result<()> {
    let summary = convert_json_file(&args.input, &args.output).with_context(|| {
        format!(
            "Failed to convert {} to {}",
            args.input.display(),
            args.output.display()
        )
    })?;

    println!(
        "Converted {} ticks to {} ({} skipped)",
        summary.converted,
        args.output.display(),
        summary.skipped
    );

    Ok(())
}
