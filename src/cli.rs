use clap::Parser;

use crate::config::{get_config_dir, get_data_dir};

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// Autosave interval in milliseconds, overrides the configuration
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Continue editing a stored draft
    #[arg(long, value_name = "TOKEN", conflicts_with_all = ["memory", "list"])]
    pub resume: Option<String>,

    /// Keep drafts in memory only
    #[arg(long)]
    pub memory: bool,

    /// Print the stored drafts and exit
    #[arg(long)]
    pub list: bool,
}

const VERSION_MESSAGE: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> String {
    let author = clap::crate_authors!();

    let config_dir_path = get_config_dir().display().to_string();
    let data_dir_path = get_data_dir().display().to_string();

    format!(
        "\
{VERSION_MESSAGE}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
    )
}
