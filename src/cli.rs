//! Command Line Interface (CLI) arguments.

use clap::{ArgAction, Parser};
use validator::{Validate, ValidationError};

/// fitbucket command line interface
#[derive(Clone, Debug, Parser, Validate)]
#[validate(schema(function = "validate_tables"))]
pub struct CommandLineArgs {
    /// Path to the JSON file of fitness records
    #[arg(
        long,
        default_value = "fitness_data_500_data_speed.json",
        env = "FITBUCKET_SOURCE"
    )]
    pub source: String,
    /// Path to the aggregate store
    #[arg(
        long,
        default_value = "~/.local/share/fitbucket/store",
        env = "FITBUCKET_STORE"
    )]
    pub store: String,
    /// Table to write heart rate aggregates to
    #[arg(long, default_value = "Heart_Rate", env = "FITBUCKET_HEART_RATE_TABLE")]
    #[validate(length(min = 1, message = "heart rate table must not be empty"))]
    pub heart_rate_table: String,
    /// Table to write speed aggregates to
    #[arg(long, default_value = "Speed", env = "FITBUCKET_SPEED_TABLE")]
    #[validate(length(min = 1, message = "speed table must not be empty"))]
    pub speed_table: String,
    /// Whether to print each aggregate table once it has been written
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "FITBUCKET_SHOW")]
    pub show: bool,
    /// Path of a file to write Prometheus metrics to at the end of the run
    #[arg(long, env = "FITBUCKET_METRICS_FILE")]
    pub metrics_file: Option<String>,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "FITBUCKET_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Whether to use Rayon for execution of CPU-bound tasks.
    #[arg(long, default_value_t = false, env = "FITBUCKET_USE_RAYON")]
    pub use_rayon: bool,
    /// Number of Rayon threads. Defaults to the number of CPUs.
    #[arg(long, env = "FITBUCKET_RAYON_THREADS")]
    #[validate(range(min = 1, message = "rayon threads must be greater than 0"))]
    pub rayon_threads: Option<usize>,
}

impl CommandLineArgs {
    /// Number of threads for the Rayon thread pool.
    pub fn rayon_threads(&self) -> usize {
        self.rayon_threads.unwrap_or_else(num_cpus::get)
    }
}

/// Validate that the measurements write to different tables
fn validate_tables(args: &CommandLineArgs) -> Result<(), ValidationError> {
    if args.heart_rate_table == args.speed_table {
        let mut error = ValidationError::new("Heart rate and speed tables must be different");
        error.add_param("table".into(), &args.speed_table);
        return Err(error);
    }
    Ok(())
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> CommandLineArgs {
        CommandLineArgs::try_parse_from(std::iter::once("fitbucket").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse_from(&[]);
        assert_eq!("Heart_Rate", args.heart_rate_table);
        assert_eq!("Speed", args.speed_table);
        assert!(args.show);
        assert!(!args.use_rayon);
        assert!(!args.enable_jaeger);
        assert_eq!(None, args.metrics_file);
        assert_eq!(num_cpus::get(), args.rayon_threads());
        args.validate().unwrap()
    }

    #[test]
    fn overrides() {
        let args = parse_from(&[
            "--source",
            "data.json",
            "--store",
            "/tmp/store",
            "--heart-rate-table",
            "hr",
            "--speed-table",
            "sp",
            "--show",
            "false",
            "--use-rayon",
            "--rayon-threads",
            "3",
            "--metrics-file",
            "/tmp/fitbucket.prom",
        ]);
        assert_eq!("data.json", args.source);
        assert_eq!("/tmp/store", args.store);
        assert_eq!("hr", args.heart_rate_table);
        assert_eq!("sp", args.speed_table);
        assert!(!args.show);
        assert!(args.use_rayon);
        assert_eq!(3, args.rayon_threads());
        assert_eq!(Some("/tmp/fitbucket.prom".to_string()), args.metrics_file);
        args.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "Heart rate and speed tables must be different")]
    fn same_tables() {
        let args = parse_from(&["--heart-rate-table", "t", "--speed-table", "t"]);
        args.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "speed table must not be empty")]
    fn empty_table() {
        let args = parse_from(&["--speed-table", ""]);
        args.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "rayon threads must be greater than 0")]
    fn zero_rayon_threads() {
        let args = parse_from(&["--rayon-threads", "0"]);
        args.validate().unwrap()
    }
}
