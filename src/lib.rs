pub mod catalog;
pub mod classify;
pub mod commands;
pub mod config;
pub mod error;
pub mod importer;
pub mod library;
pub mod paths;
pub mod ranking;
pub mod remux;
pub mod resolver;
pub mod selection;
pub mod tokens;
