use clap::Parser;
use nyx_ansi::{BOLD, CYAN, DIM, MAGENTA, RESET};
use nyx_commands::CogSelection;

#[derive(Debug, Parser)]
#[command(name = "nyx", version, about = "A modular Discord bot")]
pub struct Args {
    /// Cogs to leave out, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "COG,...")]
    pub exclude: Vec<String>,

    /// Bot token, overrides `DISCORD_TOKEN`.
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Print the version banner at startup.
    #[arg(long)]
    pub banner: bool,

    /// Print the release notes and continue.
    #[arg(long)]
    pub news: bool,

    /// Only load the core cog.
    #[arg(long)]
    pub no_cogs: bool,

    /// Debug logging, slash commands registered to `DEV_GUILD_ID` only.
    #[arg(long)]
    pub dev: bool,
}

impl Args {
    #[must_use]
    pub fn cog_selection(&self) -> CogSelection {
        CogSelection {
            exclude: self
                .exclude
                .iter()
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            no_cogs: self.no_cogs,
        }
    }

    /// Default log filter when `RUST_LOG` is not set.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.dev {
            "nyx=debug,nyx_core=debug,nyx_commands=debug,nyx_events=debug,info"
        } else {
            "nyx=info,nyx_core=info,nyx_commands=info,nyx_events=info,warn"
        }
    }
}

const NEWS: &[&str] = &[
    "Settings are served from an in-memory cache refreshed with `reload`.",
    "Reaction roles, warnings and the economy live in Postgres.",
    "A stats endpoint feeds the separate web dashboard.",
];

#[must_use]
pub fn banner() -> String {
    format!(
        "{MAGENTA}{BOLD} _ __  _   ___  __\n| '_ \\| | | \\ \\/ /\n| | | | |_| |>  < \n|_| |_|\\__, /_/\\_\\\n       |___/{RESET}  {DIM}v{}{RESET}",
        env!("CARGO_PKG_VERSION")
    )
}

#[must_use]
pub fn news() -> String {
    let mut out = format!("{CYAN}{BOLD}What's new in {}{RESET}", env!("CARGO_PKG_VERSION"));
    for line in NEWS {
        out.push_str(&format!("\n{CYAN}  - {line}{RESET}"));
    }
    out
}
