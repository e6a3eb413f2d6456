use std::io::{self, Write};

use clap::Parser;
use kubeforge::{Project, WorkloadModel};
use serde::Serialize;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, InspectArguments, OutputFormat, SampleArguments, WorkloadArguments};

mod cli;

/// The environment variable the log filter is read from.
const LOG_ENV_VAR: &str = "KUBEFORGE_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to build the project"))]
    BuildProject { source: kubeforge::project::Error },

    #[snafu(display("workload {name:?} is not declared by the configuration"))]
    UnknownWorkload { name: String },

    #[snafu(display("failed to serialize the project model as YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to serialize the project model as JSON"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("failed to write to stdout"))]
    WriteOutput { source: io::Error },
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_tracing();

    let output = match cli.command {
        Command::Inspect(arguments) => inspect(&arguments)?,
        Command::Sample(arguments) => sample(&arguments)?,
    };

    io::stdout()
        .write_all(output.as_bytes())
        .context(WriteOutputSnafu)
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn inspect(arguments: &InspectArguments) -> Result<String, Error> {
    let project = build(&arguments.workload)?;

    match &arguments.workload.workload {
        Some(name) => render(select(&project, name)?, arguments.output),
        None => render(&project, arguments.output),
    }
}

fn sample(arguments: &SampleArguments) -> Result<String, Error> {
    let project = build(&arguments.workload)?;
    let workload = match &arguments.workload.workload {
        Some(name) => select(&project, name)?,
        None => &project.root,
    };

    Ok(if arguments.required_only {
        workload.required_sample.clone()
    } else {
        workload.sample.clone()
    })
}

fn build(arguments: &WorkloadArguments) -> Result<Project, Error> {
    let project = Project::load(&arguments.config).context(BuildProjectSnafu)?;
    info!(
        root = %project.root.name,
        components = project.components.len(),
        "built project"
    );
    Ok(project)
}

fn select<'a>(project: &'a Project, name: &str) -> Result<&'a WorkloadModel, Error> {
    project.workload(name).context(UnknownWorkloadSnafu { name })
}

fn render(value: &impl Serialize, format: OutputFormat) -> Result<String, Error> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).context(SerializeYamlSnafu),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|json| json + "\n")
            .context(SerializeJsonSnafu),
    }
}
