use crate::config::Config;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::path::PathBuf;

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
}

/// Squash league opponent contacts
///
/// Looks up the group a player has been placed in for the season, lists the
/// other players of that group and prints how to reach each of them.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
pub struct Args {
    /// Player to look up, as "Lastname" or "Lastname F."
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// League spreadsheet with the season's groups (.xls, .xlsx, .ods)
    #[arg(value_name = "LEAGUE_DB", required_unless_present = "list_config")]
    pub league_db: Option<PathBuf>,

    /// Players spreadsheet with names and contact details
    #[arg(value_name = "PLAYERS_DB")]
    pub players_db: Option<PathBuf>,

    /// Log lookup details to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the effective configuration and exit
    #[arg(long, help_heading = "Configuration")]
    pub list_config: bool,
}

impl Args {
    /// The player to look up, falling back to the configured default.
    pub fn player_name(&self, config: &Config) -> String {
        self.name.clone().unwrap_or_else(|| config.default_player.clone())
    }

    /// The players database, falling back to the configured default.
    pub fn players_db_path(&self, config: &Config) -> PathBuf {
        self.players_db
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.players_db))
    }

    /// The filter directive for this run.
    pub fn log_filter(&self, config: &Config) -> String {
        if self.verbose {
            "league_contacts=debug".to_owned()
        } else {
            config.log_filter.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_databases_and_name() {
        let args = Args::try_parse_from(["league_contacts", "-n", "Meyer M.", "liga.ods", "players.xlsx"]).unwrap();
        let config = Config::default();
        assert_eq!(args.player_name(&config), "Meyer M.");
        assert_eq!(args.league_db, Some(PathBuf::from("liga.ods")));
        assert_eq!(args.players_db_path(&config), PathBuf::from("players.xlsx"));
        assert_eq!(args.log_filter(&config), "league_contacts=warn");
    }

    #[test]
    fn defaults_come_from_config() {
        let args = Args::try_parse_from(["league_contacts", "--verbose", "liga.xls"]).unwrap();
        let config = Config::default();
        assert_eq!(args.player_name(&config), "Chaichenets");
        assert_eq!(args.players_db_path(&config), PathBuf::from("Rangliste Adressen.xls"));
        assert_eq!(args.log_filter(&config), "league_contacts=debug");
    }

    #[test]
    fn league_db_is_required() {
        assert!(Args::try_parse_from(["league_contacts"]).is_err());
        assert!(Args::try_parse_from(["league_contacts", "a", "b", "c"]).is_err());
        let args = Args::try_parse_from(["league_contacts", "--list-config"]).unwrap();
        assert!(args.list_config);
        assert_eq!(args.league_db, None);
    }
}
