use clap::Parser;
use std::path::PathBuf;

use crate::blink_control::Period;

/// blinkd: LED blink control daemon driven by GPIO buttons
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Initial blink period in milliseconds (invalid values fall back to the default)
    #[arg(value_name = "PERIOD_MS", allow_negative_numbers = true)]
    pub period: Option<String>,

    /// YAML config file path (default: $BLINKD_CONFIG or /etc/blinkd/config.yml)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Stay in the foreground instead of daemonizing
    #[arg(short = 'f', long = "foreground", default_value = "false")]
    pub foreground: bool,
}

impl Cli {
    /// Period requested on the command line, if it is a positive integer
    /// that fits a nanosecond [`Period`].
    pub fn period_ms(&self) -> Option<u64> {
        self.period
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|ms| Period::from_millis(*ms).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("blinkd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_arguments() {
        let cli = parse(&[]);
        assert_eq!(cli.period_ms(), None);
        assert_eq!(cli.config, None);
        assert!(!cli.foreground);
    }

    #[test]
    fn positional_period() {
        assert_eq!(parse(&["250"]).period_ms(), Some(250));
    }

    #[test]
    fn invalid_period_is_ignored() {
        assert_eq!(parse(&["fast"]).period_ms(), None);
        assert_eq!(parse(&["0"]).period_ms(), None);
        assert_eq!(parse(&["12.5"]).period_ms(), None);
        assert_eq!(parse(&["-5"]).period_ms(), None);
        assert_eq!(parse(&["99999999999999999"]).period_ms(), None);
        assert_eq!(parse(&["99999999999999999999999"]).period_ms(), None);
    }

    #[test]
    fn largest_representable_period_is_kept() {
        let max = u64::MAX / 1_000_000;
        let arg = max.to_string();
        assert_eq!(parse(&[arg.as_str()]).period_ms(), Some(max));
    }

    #[test]
    fn flags() {
        let cli = parse(&["-f", "-c", "/etc/blinkd/lab.yml", "100"]);
        assert!(cli.foreground);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/blinkd/lab.yml")));
        assert_eq!(cli.period_ms(), Some(100));
    }
}
