use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "berth",
    version,
    about = "A terminal dashboard for local Docker images, containers and volumes."
)]
pub struct CliArgs {
    /// Refresh interval in milliseconds (defaults to the config value, else 500)
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Start with stopped containers listed
    #[arg(short, long)]
    pub all: bool,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Explicit config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn defaults_leave_overrides_unset() {
        let args = CliArgs::try_parse_from(["berth"]).unwrap();
        assert_eq!(args.refresh_ms, None);
        assert!(!args.all);
        assert_eq!(args.log_filter, "info");
        assert!(args.log_file.is_none());
    }

    #[test]
    fn parses_short_all_and_refresh() {
        let args = CliArgs::try_parse_from(["berth", "-a", "--refresh-ms", "250"]).unwrap();
        assert!(args.all);
        assert_eq!(args.refresh_ms, Some(250));
    }
}
