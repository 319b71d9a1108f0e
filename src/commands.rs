//! Subcommand definitions.

use clap::Subcommand;
use svcbind_core::RebindStrategy;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scripted register/rebind/unregister scenario against the
    /// in-memory registry and print every binding change
    Demo {
        /// Rebinding strategy (suspend or locking); defaults to the settings
        #[arg(short, long)]
        strategy: Option<RebindStrategy>,
    },

    /// Compose the service spec a dependency would send to the registry
    Compose {
        /// Interface name
        interface: String,

        /// Version range, e.g. "[1.0.0,2.0.0)"
        #[arg(long = "version-range")]
        version_range: Option<String>,

        /// LDAP-style filter, e.g. "(color=red)"
        #[arg(short, long)]
        filter: Option<String>,

        /// Add the language clause for this tag (defaults to the settings)
        #[arg(long)]
        language: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use crate::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn test_demo_strategy_parses() {
        let cli = Cli::parse_from(["svcbind", "demo", "--strategy", "Locking"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Demo {
                strategy: Some(RebindStrategy::Locking)
            })
        ));
    }

    #[test]
    fn test_compose_args() {
        let cli = Cli::parse_from([
            "svcbind",
            "compose",
            "Echo",
            "--version-range",
            "[1,2)",
            "-f",
            "(a=1)",
            "--language",
            "cxx",
        ]);
        let Some(Commands::Compose {
            interface,
            version_range,
            filter,
            language,
        }) = cli.command
        else {
            panic!("expected compose");
        };
        assert_eq!(interface, "Echo");
        assert_eq!(version_range.as_deref(), Some("[1,2)"));
        assert_eq!(filter.as_deref(), Some("(a=1)"));
        assert_eq!(language.as_deref(), Some("cxx"));
    }
}
