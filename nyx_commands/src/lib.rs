#![warn(clippy::pedantic)]
// clippy warns for u64 -> i64 conversions despite this being totally okay in this scenario.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::unreadable_literal,
    clippy::unused_async
)]

pub mod economy;
pub mod general;
pub mod images;
pub mod info;
pub mod leveling;
pub mod moderation;
pub mod owner;
pub mod reaction_roles;
pub mod utils;
pub mod web;

pub use nyx_core::data::structs::{Command, Context, Data, Error, PrefixContext};

/// A named group of commands that can be left out at startup.
pub struct Cog {
    pub name: &'static str,
    pub description: &'static str,
    pub commands: fn() -> Vec<Command>,
}

/// The cog that is always loaded.
pub const REQUIRED_COG: &str = "core";

#[must_use]
pub fn cogs() -> [Cog; 9] {
    [
        Cog {
            name: REQUIRED_COG,
            description: "Help, status and per-server settings",
            commands: || general::commands().into(),
        },
        Cog {
            name: "info",
            description: "Server and user information",
            commands: || info::commands().into(),
        },
        Cog {
            name: "moderation",
            description: "Kicks, bans, timeouts, warnings and purging",
            commands: || moderation::commands().into(),
        },
        Cog {
            name: "images",
            description: "Image filters for attachments and avatars",
            commands: || images::commands().into(),
        },
        Cog {
            name: "web",
            description: "Anime, COVID, OCR, screenshots and translation",
            commands: || web::commands().into(),
        },
        Cog {
            name: "leveling",
            description: "Message XP ranks",
            commands: || leveling::commands().into(),
        },
        Cog {
            name: "economy",
            description: "Coins, daily rewards and payments",
            commands: || economy::commands().into(),
        },
        Cog {
            name: "reactionroles",
            description: "Roles granted by reacting to a message",
            commands: || reaction_roles::commands().into(),
        },
        Cog {
            name: "owner",
            description: "Bot owner tools",
            commands: || owner::commands().into(),
        },
    ]
}

/// Which cogs to load, from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CogSelection {
    pub exclude: Vec<String>,
    pub no_cogs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    Unknown(Vec<String>),
    Required(&'static str),
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionError::Unknown(names) => {
                let known = cogs().map(|cog| cog.name).join(", ");
                write!(f, "unknown cog(s): {} (known: {known})", names.join(", "))
            }
            SelectionError::Required(name) => write!(f, "the `{name}` cog cannot be excluded"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// Filters `cogs` down to the selected ones, keeping registry order.
pub fn select<'a>(cogs: &'a [Cog], selection: &CogSelection) -> Result<Vec<&'a Cog>, SelectionError> {
    let unknown: Vec<String> = selection
        .exclude
        .iter()
        .filter(|name| !cogs.iter().any(|cog| cog.name.eq_ignore_ascii_case(name)))
        .cloned()
        .collect();

    if !unknown.is_empty() {
        return Err(SelectionError::Unknown(unknown));
    }

    if selection
        .exclude
        .iter()
        .any(|name| name.eq_ignore_ascii_case(REQUIRED_COG))
    {
        return Err(SelectionError::Required(REQUIRED_COG));
    }

    Ok(cogs
        .iter()
        .filter(|cog| {
            if selection.no_cogs {
                return cog.name == REQUIRED_COG;
            }
            !selection
                .exclude
                .iter()
                .any(|name| name.eq_ignore_ascii_case(cog.name))
        })
        .collect())
}

/// The commands of every selected cog.
pub fn commands(selection: &CogSelection) -> Result<Vec<Command>, SelectionError> {
    let cogs = cogs();
    let selected = select(&cogs, selection)?;

    for cog in &selected {
        tracing::debug!(cog = cog.name, "Loading cog");
    }

    Ok(selected
        .into_iter()
        .flat_map(|cog| (cog.commands)())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(selection: &CogSelection) -> Result<Vec<&'static str>, SelectionError> {
        let cogs = cogs();
        select(&cogs, selection).map(|cogs| cogs.iter().map(|cog| cog.name).collect())
    }

    #[test]
    fn everything_by_default() {
        let all = names(&CogSelection::default()).unwrap();
        assert_eq!(all.len(), cogs().len());
        assert_eq!(all[0], "core");
    }

    #[test]
    fn exclusions_are_case_insensitive() {
        let selection = CogSelection {
            exclude: vec!["Images".to_owned(), "web".to_owned()],
            no_cogs: false,
        };
        let selected = names(&selection).unwrap();
        assert!(!selected.contains(&"images"));
        assert!(!selected.contains(&"web"));
        assert!(selected.contains(&"moderation"));
    }

    #[test]
    fn no_cogs_keeps_core() {
        let selection = CogSelection {
            exclude: Vec::new(),
            no_cogs: true,
        };
        assert_eq!(names(&selection).unwrap(), ["core"]);
    }

    #[test]
    fn unknown_names_are_reported() {
        let selection = CogSelection {
            exclude: vec!["music".to_owned(), "owner".to_owned(), "nsfw".to_owned()],
            no_cogs: false,
        };
        assert_eq!(
            names(&selection),
            Err(SelectionError::Unknown(vec![
                "music".to_owned(),
                "nsfw".to_owned()
            ]))
        );
    }

    #[test]
    fn core_cannot_be_excluded() {
        let selection = CogSelection {
            exclude: vec!["core".to_owned()],
            no_cogs: false,
        };
        assert_eq!(names(&selection), Err(SelectionError::Required("core")));
    }

    #[test]
    fn cog_names_are_unique() {
        let cogs = cogs();
        let mut names: Vec<_> = cogs.iter().map(|cog| cog.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), cogs.len());
    }
}
