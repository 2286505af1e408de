pub mod action;
pub mod app;
pub mod autosave;
pub mod cli;
pub mod config;
pub mod draft;
pub mod editor;
pub mod errors;
pub mod logging;
pub mod statusbar;
pub mod transport;
