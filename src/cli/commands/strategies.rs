//! List strategies command.

use anyhow::Result;
use trading_strategies::{StrategyRegistry, DEFAULT_STRATEGY};

pub fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        let indicators: Vec<&str> = info.indicators.iter().map(|k| k.name()).collect();

        println!("  {} ({})", info.name, info.key);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  Indicators: {}", indicators.join(", "));
        println!("  Defaults:   {}", info.default_config);
        println!();
    }

    println!("Use --strategy <key> to select a strategy (default: {DEFAULT_STRATEGY}).");

    Ok(())
}
