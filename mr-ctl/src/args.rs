use clap::{Parser, Subcommand};

//
// For parsing user specified command.
//
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the coordinator server
    #[arg(short = 'j', long = "join", default_value = "http://[::1]:8030")]
    pub address: String,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display how many map and reduce tasks are done.
    Status,
    /// Block until every task is done.
    Wait {
        /// Seconds between probes.
        #[arg(short, long, default_value = "1")]
        interval: u64,
    },
}
