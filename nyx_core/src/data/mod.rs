pub mod database;
pub mod settings;
pub mod structs;
