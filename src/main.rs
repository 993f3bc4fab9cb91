use anyhow::{Context, Result};
use clap::Parser;
use league_contacts::cli::Args;
use league_contacts::config::Config;
use league_contacts::logging::setup_logging;
use league_contacts::lookup::{get_contacts, get_group_and_opponents};
use league_contacts::report::write_report;
use league_contacts::spreadsheet::load_grid;
use std::io::Write;
use tracing::debug;

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;
    setup_logging(&args.log_filter(&config))?;

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    if args.list_config {
        config.display(&mut writer)?;
        return Ok(());
    }

    let league_db = args
        .league_db
        .as_deref()
        .context("No league database given")?;
    let player_name = args.player_name(&config);
    let players_db = args.players_db_path(&config);
    debug!(player = %player_name, league_db = %league_db.display(), players_db = %players_db.display(), "starting lookup");

    let league = load_grid(league_db)?;
    let (group, opponents) = get_group_and_opponents(&league, &player_name)
        .with_context(|| format!("Cannot find the group of '{player_name}' in '{}'", league_db.display()))?;

    let players = load_grid(&players_db)?;
    let contacts = get_contacts(&players, &opponents)
        .with_context(|| format!("Cannot look up opponents in '{}'", players_db.display()))?;

    write_report(&mut writer, &group, &contacts)?;
    writer.flush()?;
    Ok(())
}
