pub mod classify;
pub mod import;
