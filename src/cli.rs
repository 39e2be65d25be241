use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "osurec", version, about = "Resolve freshly written osu! replays to their beatmaps")]
pub struct Args {
    /// Configuration file, layered over the per-user one
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// osu! installation directory
    #[arg(long, value_name = "DIR", global = true)]
    pub osu_root: Option<PathBuf>,

    /// More logging (-v debug, -vv trace). RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Watch the replay directory until interrupted
    Watch,
    /// Print the beatmap file for a content hash
    Lookup {
        /// MD5 of the .osu file, as stored in replays
        hash: String,
    },
    /// Print the number of beatmaps osu!.db declares
    Count,
    /// Rebuild the index from osu!.db
    Reindex,
}

impl Args {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn definition() {
        Args::command().debug_assert();
    }

    #[rstest]
    #[case(&["osurec", "watch"], Command::Watch)]
    #[case(&["osurec", "count"], Command::Count)]
    #[case(&["osurec", "reindex"], Command::Reindex)]
    #[case(&["osurec", "lookup", "0123abcd"], Command::Lookup { hash: "0123abcd".to_string() })]
    fn commands(#[case] argv: &[&str], #[case] expected: Command) {
        assert_eq!(Args::try_parse_from(argv).unwrap().command, expected);
    }

    #[rstest]
    #[case(&["osurec", "count"], "info")]
    #[case(&["osurec", "-v", "count"], "debug")]
    #[case(&["osurec", "count", "-vvv"], "trace")]
    fn verbosity(#[case] argv: &[&str], #[case] level: &str) {
        assert_eq!(Args::try_parse_from(argv).unwrap().log_level(), level);
    }

    #[test]
    fn global_options() {
        let args = Args::try_parse_from(["osurec", "lookup", "abc", "--osu-root", "/games/osu!", "-c", "my.toml"]).unwrap();
        assert_eq!(args.osu_root, Some(PathBuf::from("/games/osu!")));
        assert_eq!(args.config, Some(PathBuf::from("my.toml")));
    }

    #[test]
    fn lookup_requires_hash() {
        assert!(Args::try_parse_from(["osurec", "lookup"]).is_err());
    }
}
