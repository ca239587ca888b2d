use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the coordinator server
    #[arg(short = 'j', long = "join", default_value = "http://[::1]:8030")]
    pub address: String,

    /// Name of the workload to run (wc, grep, vertex-degree).
    #[arg(short, long, default_value = "wc")]
    pub workload: String,

    /// Working directory for input, intermediate and output files.
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Milliseconds to wait before polling again when there is no work.
    #[arg(long, default_value = "500")]
    pub poll_ms: u64,

    /// Consecutive failed polls after which the worker exits.
    #[arg(long, default_value = "10")]
    pub max_failed_polls: u32,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub args: Vec<String>,
}
