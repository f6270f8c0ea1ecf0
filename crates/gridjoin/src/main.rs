// gridjoin entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout is for the preview)
// 2. Load config (copying defaults/ into config/ on first run)
// 3. Run the pipeline
// 4. Print the preview and a one-line reconciliation summary

use anyhow::Context;
use gridjoin_core::config;
use gridjoin_core::pipeline;
use gridjoin_core::report;
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("gridjoin starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: defense={}, players={}, odds={}",
        config.data_paths.pass_defense, config.data_paths.player_pool, config.data_paths.vegas
    );

    let outcome = pipeline::run(&config).context("pipeline failed")?;

    print!("{}", report::render_preview(&outcome.table, config.output.preview_rows));

    let join = &outcome.report;
    println!(
        "\n{} of {} player rows joined; {} without opponent defense, {} without odds, {} duplicate odds keys",
        join.rows_out,
        join.players_in,
        join.unmatched_opponent.count,
        join.unmatched_odds.count,
        join.odds_conflicts.count
    );
    if outcome.summary.odds.skipped.count > 0 {
        println!(
            "{} games skipped while reshaping odds",
            outcome.summary.odds.skipped.count
        );
    }

    info!("gridjoin finished");
    Ok(())
}

/// Initialize tracing to log to a file so stdout carries only the table.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("gridjoin.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridjoin=info,gridjoin_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
