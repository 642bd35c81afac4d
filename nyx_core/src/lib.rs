#![warn(clippy::pedantic)]
// ids are stored as BIGINT, so u64 <-> i64 casts are expected.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::unreadable_literal,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

pub mod apis;
pub mod cache;
pub mod config;
pub mod data;
pub mod economy;
pub mod embeds;
pub mod emojis;
pub mod imaging;
pub mod leveling;
pub mod stats;
