use anyhow::Context;
use clap::{Parser, Subcommand};
use image_handler_stack::assembler::ParameterValues;
use image_handler_stack::config::{DeploymentConfig, RegionMode, SynthesisOptions};
use image_handler_stack::constants::{DEFAULT_VERSION, REGION_MODE_ENV_VAR, VERSION_ENV_VAR};
use image_handler_stack::logging::{init_subscriber, LogFormat};
use image_handler_stack::preview::{realize, DeploymentInputs};
use image_handler_stack::stack::synthesize;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Image handler stack synthesizer - renders the deployment template
#[derive(Parser, Debug)]
#[command(name = "image-handler-stack")]
#[command(version, about, long_about = None)]
struct Args {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the template
    Synth {
        /// Deployment file with parameter values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Version embedded in the template
        #[arg(long, env = VERSION_ENV_VAR)]
        template_version: Option<String>,

        /// Any non-empty value enables region mode
        #[arg(long, env = REGION_MODE_ENV_VAR)]
        region_mode: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Render the template and evaluate it against the deployment file
    Preview {
        /// Deployment file with parameter and attribute values
        #[arg(short, long)]
        config: PathBuf,

        #[arg(long, env = VERSION_ENV_VAR)]
        template_version: Option<String>,

        #[arg(long, env = REGION_MODE_ENV_VAR)]
        region_mode: Option<String>,
    },

    /// Render the standard and region-mode templates side by side
    Matrix {
        /// Directory receiving one template per variant
        #[arg(long)]
        output_dir: PathBuf,

        #[arg(long, env = VERSION_ENV_VAR)]
        template_version: Option<String>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DeploymentConfig> {
    match path {
        Some(path) => DeploymentConfig::from_file(path)
            .with_context(|| format!("Failed to load deployment file '{}'", path.display())),
        None => Ok(DeploymentConfig::default()),
    }
}

fn write_or_print(json: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, format!("{}\n", json))
            .with_context(|| format!("Failed to write '{}'", path.display())),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Synth {
            config,
            template_version,
            region_mode,
            output,
            compact,
        } => {
            let config = load_config(config.as_deref())?;
            let options =
                config.synthesis_options(template_version.as_deref(), region_mode.as_deref());
            let template = synthesize(&options, &config.parameters)
                .context("Template synthesis failed")?;
            let json = if compact {
                template.to_json_compact()?
            } else {
                template.to_json()?
            };
            write_or_print(&json, output.as_deref())?;

            tracing::info!(
                region_mode = ?options.region_mode,
                parameters = template.parameters.len(),
                outputs = template.outputs.len(),
                "Template rendered"
            );
        }
        Command::Preview {
            config,
            template_version,
            region_mode,
        } => {
            let config = load_config(Some(config.as_path()))?;
            let options =
                config.synthesis_options(template_version.as_deref(), region_mode.as_deref());
            let template = synthesize(&options, &config.parameters)
                .context("Template synthesis failed")?;
            let inputs = DeploymentInputs {
                parameters: config.parameters.clone(),
                attributes: config.attributes.clone(),
            };
            let deployment = realize(&template, &inputs).context("Deployment preview failed")?;
            println!("{}", serde_json::to_string_pretty(&deployment)?);
        }
        Command::Matrix {
            output_dir,
            template_version,
        } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create '{}'", output_dir.display()))?;

            RegionMode::all()
                .par_iter()
                .map(|mode| -> anyhow::Result<()> {
                    let options = SynthesisOptions::new(
                        template_version.as_deref().unwrap_or(DEFAULT_VERSION),
                        *mode,
                    );
                    let template = synthesize(&options, &ParameterValues::new())
                        .with_context(|| format!("Synthesis failed for {:?}", mode))?;
                    let path = output_dir.join(mode.template_file_name());
                    write_or_print(&template.to_json()?, Some(path.as_path()))?;
                    tracing::info!(path = %path.display(), "Template written");
                    Ok(())
                })
                .collect::<anyhow::Result<Vec<()>>>()?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_subscriber(args.log_format, &args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
