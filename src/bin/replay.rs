use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use darkpool_signals::config::SignalConfig;
use darkpool_signals::providers::{load_bars_json, load_levels_json};
use darkpool_signals::replay::{write_trace_csv, ReplayEngine, SessionSummary};
use darkpool_signals::signals::MasterSignalGenerator;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = SignalConfig::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    // Refuse to run on a malformed thresholds table.
    cfg.validate().context("invalid signal configuration")?;

    // CLI overrides: replay <levels.json> <bars.json>
    let args: Vec<String> = std::env::args().collect();
    let levels_path = args.get(1).cloned().unwrap_or_else(|| cfg.levels_path.clone());
    let bars_path = args.get(2).cloned().unwrap_or_else(|| cfg.bars_path.clone());

    println!("╔══════════════════════════════════════════════════╗");
    println!("║        DARK-POOL SIGNAL SESSION REPLAY           ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!("  Symbol:  {}", cfg.symbol);
    println!("  Levels:  {levels_path}");
    println!("  Bars:    {bars_path}");
    println!();

    let levels = load_levels_json(&levels_path, &cfg.symbol)?;
    let bars = load_bars_json(&bars_path)?;
    info!("loaded {} levels, {} bars", levels.len(), bars.len());

    let mut engine = ReplayEngine::new(&cfg)?;
    let trace = engine.replay(&levels, &bars)?;

    let summary = SessionSummary::from_trace(&trace);
    summary.print_summary();
    println!();

    let generator = MasterSignalGenerator::new(&cfg)?;
    let (masters, tally) = generator.generate(&trace.bars)?;

    println!("Master Signals ({}):", masters.len());
    for m in &masters {
        let tier = if m.is_master_signal { "MASTER" } else { "signal" };
        println!(
            "  [{tier}] {} {} @ {:.2} | SL {:.2} TP {:.2} (RR {:.1}) | conf {:.0}%",
            m.timestamp.format("%H:%M"),
            m.action,
            m.entry_price,
            m.stop_loss,
            m.take_profit,
            m.risk_reward_ratio,
            m.confidence * 100.0,
        );
        println!("      {}", m.primary_reason);
        for factor in &m.supporting_factors {
            println!("      - {factor}");
        }
    }
    println!();
    println!("Rejections:");
    println!("  low_dp_strength:       {}", tally.low_dp_strength);
    println!("  no_volume:             {}", tally.no_volume);
    println!("  weak_momentum:         {}", tally.weak_momentum);
    println!("  poor_regime:           {}", tally.poor_regime);
    println!("  no_magnet_interaction: {}", tally.no_magnet_interaction);

    let trace_file = format!(
        "data/trace_{}_{}.csv",
        cfg.symbol,
        summary
            .session_date
            .map(|d| d.format("%Y%m%d").to_string())
            .unwrap_or_else(|| "empty".to_string()),
    );
    if let Some(parent) = std::path::Path::new(&trace_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&trace_file)?;
    write_trace_csv(&trace, file)?;
    println!("\nTrace saved to: {trace_file}");

    Ok(())
}
