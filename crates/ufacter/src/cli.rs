//! Command-line flags

use std::path::PathBuf;

use clap::Parser;
use ufacter_core::CustomFactsOrder;
use ufacter_facts::Module;
use ufacter_format::Format;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "ufacter")]
#[command(version, about = "Collect host facts and print them as one document", long_about = None)]
pub struct Cli {
    /// Comma-separated modules to run (cpu,mem,host,disk,net,route,link,ufacter)
    #[arg(short, long)]
    pub modules: Option<String>,

    /// Output format: json, yaml, flat or plaintext
    #[arg(short, long, conflicts_with_all = ["json", "yaml"])]
    pub format: Option<Format>,

    /// Shorthand for --format json
    #[arg(long, conflicts_with = "yaml")]
    pub json: bool,

    /// Shorthand for --format yaml
    #[arg(long)]
    pub yaml: bool,

    /// Leave out facts that change between runs
    #[arg(long)]
    pub no_volatile: bool,

    /// Leave out facts the legacy facter tool does not report
    #[arg(long)]
    pub no_extended: bool,

    /// YAML file with additional facts
    #[arg(long, value_name = "FILE")]
    pub custom_facts: Option<PathBuf>,

    /// Let custom facts override reporter facts
    #[arg(long)]
    pub custom_facts_last: bool,

    /// Per-reporter timeout in seconds, 0 disables it
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Capacity of the fact queue
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Overlay the flags on file configuration
    ///
    /// # Errors
    /// Returns an error for unknown module names.
    pub fn apply(&self, mut config: Config) -> eyre::Result<Config> {
        if let Some(list) = &self.modules {
            config.modules = Some(Module::parse_list(list)?);
        }

        if let Some(format) = self.format {
            config.format = format;
        } else if self.json {
            config.format = Format::Json;
        } else if self.yaml {
            config.format = Format::Yaml;
        }

        let collection = &mut config.collection;
        if self.no_volatile {
            collection.include_volatile = false;
        }
        if self.no_extended {
            collection.include_extended = false;
        }
        if let Some(path) = &self.custom_facts {
            collection.custom_facts = Some(path.clone());
        }
        if self.custom_facts_last {
            collection.custom_facts_order = CustomFactsOrder::AfterReporters;
        }
        if let Some(secs) = self.timeout {
            collection.reporter_timeout_secs = secs;
        }
        if let Some(capacity) = self.queue_capacity {
            collection.queue_capacity = capacity;
        }

        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.log_json {
            config.log_json = true;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ufacter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_file() {
        let file = Config {
            format: Format::Plaintext,
            modules: Some(vec![Module::Disk]),
            ..Config::default()
        };

        let config = parse(&["--json", "--no-volatile", "--modules", "cpu,net", "--timeout", "0"])
            .apply(file)
            .unwrap();

        assert_eq!(config.format, Format::Json);
        assert_eq!(config.modules, Some(vec![Module::Cpu, Module::Net]));
        assert!(!config.collection.include_volatile);
        assert!(config.collection.include_extended);
        assert_eq!(config.collection.reporter_timeout(), None);
    }

    #[test]
    fn test_file_values_survive_without_flags() {
        let file = Config {
            format: Format::Flat,
            ..Config::default()
        };
        let config = parse(&[]).apply(file).unwrap();
        assert_eq!(config.format, Format::Flat);
    }

    #[test]
    fn test_format_flags_conflict() {
        let result = Cli::try_parse_from(["ufacter", "--json", "--yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_module_flag_selects_nothing() {
        for list in ["", ","] {
            let config = parse(&["--modules", list]).apply(Config::default()).unwrap();
            assert!(config.selected_modules().is_empty());
        }
        let config = parse(&[]).apply(Config::default()).unwrap();
        assert_eq!(config.selected_modules(), Module::ALL.to_vec());
    }

    #[test]
    fn test_unknown_module_rejected() {
        let result = parse(&["--modules", "cpu,quantum"]).apply(Config::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_facts_order() {
        let config = parse(&["--custom-facts", "extra.yaml", "--custom-facts-last"])
            .apply(Config::default())
            .unwrap();
        assert_eq!(
            config.collection.custom_facts,
            Some(PathBuf::from("extra.yaml"))
        );
        assert_eq!(
            config.collection.custom_facts_order,
            CustomFactsOrder::AfterReporters
        );
    }
}
