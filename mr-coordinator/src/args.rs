use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address for the server to listen on.
    #[arg(long, default_value = "[::1]")]
    pub host: String,

    /// The port for the server to run on.
    #[arg(short, long, default_value = "8030")]
    pub port: u16,

    /// Number of reduce partitions.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub n_reduce: u32,

    /// Seconds a worker may hold a task before it is handed to someone else.
    #[arg(short, long, default_value = "10")]
    pub lease_secs: u64,

    /// Seconds to keep serving after the job is done, so polling workers
    /// learn that they can exit.
    #[arg(long, default_value = "2")]
    pub linger_secs: u64,

    /// Input files, one map task each.
    #[arg(required = true)]
    pub files: Vec<String>,
}
