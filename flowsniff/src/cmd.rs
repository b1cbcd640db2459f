use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

#[derive(Parser)]
#[command(disable_help_subcommand = true)]
pub struct Cmd {
    /// Set the log verbose.
    #[arg(
        short = 'v',
        default_value = "info",
        value_name = "verbose",
        global = true,
        value_parser = ["trace","debug","info","warn","error"]
    )]
    pub verbose: String,

    /// One or more ifaces to capture on. (e.g. -i lo,eth0...)
    #[arg(short = 'i', value_name = "iface,", global = true, value_delimiter = ',')]
    pub ifaces: Vec<String>,

    /// Count traffic to or from the given cidrs separately.
    #[arg(short = 'c', value_name = "cidr,", global = true, value_delimiter = ',')]
    pub cidrs: Vec<String>,

    /// Where decoded records are written.
    #[arg(
        short = 'o',
        value_name = "FORMAT",
        value_enum,
        global = true
    )]
    pub output: Option<RecordFormat>,

    #[command(subcommand)]
    pub sub_cmd: SubCmd,
}

#[derive(ValueEnum, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// One JSON object per line on stdout
    Json,

    /// Coloured one-line summaries on stdout
    Console,

    /// Only aggregate reports
    #[default]
    None,
}

#[derive(Subcommand, Clone)]
pub enum SubCmd {
    /// Capture on the interfaces given with -i
    Live,

    /// Check whether a raw socket can be opened on every interface
    Check,

    /// Capture with settings loaded from a configuration file
    Run(Run),
}

#[derive(Parser, Clone)]
pub struct Run {
    /// Specify the configuration file to be loaded by flowsniff
    pub config: String,
}
