use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Inspects workload configurations and the operator project they describe.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the project model built from a workload configuration.
    Inspect(InspectArguments),

    /// Print the sample custom resource of a workload.
    Sample(SampleArguments),
}

#[derive(Debug, Args)]
pub struct WorkloadArguments {
    /// Path of the workload configuration.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Restrict the output to a single workload. Defaults to the standalone
    /// workload or the collection.
    #[arg(short, long)]
    pub workload: Option<String>,
}

#[derive(Debug, Args)]
pub struct InspectArguments {
    #[command(flatten)]
    pub workload: WorkloadArguments,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SampleArguments {
    #[command(flatten)]
    pub workload: WorkloadArguments,

    /// Only include the fields a user has to set.
    #[arg(long)]
    pub required_only: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_inspect_arguments() {
        let cli = Cli::parse_from(["kubeforge", "inspect", "platform.yaml", "-o", "json", "-w", "CacheTier"]);

        let Command::Inspect(arguments) = cli.command else {
            panic!("expected the inspect command");
        };
        assert_eq!(arguments.output, OutputFormat::Json);
        assert_eq!(arguments.workload.workload.as_deref(), Some("CacheTier"));
        assert_eq!(arguments.workload.config, PathBuf::from("platform.yaml"));
    }

    #[test]
    fn defaults_to_yaml_output() {
        let cli = Cli::parse_from(["kubeforge", "inspect", "platform.yaml"]);

        let Command::Inspect(arguments) = cli.command else {
            panic!("expected the inspect command");
        };
        assert_eq!(arguments.output, OutputFormat::Yaml);
        assert_eq!(arguments.workload.workload, None);
    }
}
