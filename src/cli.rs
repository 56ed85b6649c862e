use crate::build_docs::DocsBuilder;
use crate::openapi_builder::build_openapi_spec;
use crate::registry::Api;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::server::{serve, DocsState};
use crate::settings::Settings;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Tastypie OpenAPI - Generate OpenAPI documentation from Tastypie resource registries
#[derive(Parser, Debug)]
#[command(name = "tastypie-openapi")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Settings file (defaults to $TASTYPIE_OPENAPI_SETTINGS, then tastypie_openapi.yaml)
    #[arg(short = 's', long = "settings", value_name = "FILE", global = true)]
    pub settings: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print or write the OpenAPI document
    Generate {
        /// Output format (yaml or json)
        #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
        output_format: OutputFormat,

        /// Output file path (if not specified, outputs to stdout)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output_path: Option<PathBuf>,

        /// Server URL written into the document, overriding the settings
        #[arg(long = "server-url", value_name = "URL")]
        server_url: Option<String>,
    },
    /// Serve the Swagger UI and the OpenAPI document over HTTP
    Serve {
        /// Address to listen on, overriding the settings
        #[arg(short = 'b', long = "bind", value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },
    /// Build a static documentation directory into docs_dir
    BuildDocs,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Load the settings and every registry they name
pub fn load_project(args: &CliArgs) -> Result<(Settings, Vec<Api>)> {
    let settings_path = Settings::locate(args.settings.as_deref());
    info!("Settings: {}", settings_path.display());

    let settings = Settings::load(&settings_path)?;
    debug!("Loaded settings: {:?}", settings);

    let apis = settings.load_apis()?;
    Ok((settings, apis))
}

/// Run the selected command
pub fn run(args: CliArgs) -> Result<()> {
    let (settings, apis) = load_project(&args)?;

    match args.command {
        Command::Generate {
            output_format,
            output_path,
            server_url,
        } => {
            let document = build_openapi_spec(&settings, &apis, server_url.as_deref())?;

            info!("Serializing to {:?} format...", output_format);
            let content = match output_format {
                OutputFormat::Yaml => serialize_yaml(&document)?,
                OutputFormat::Json => serialize_json(&document)?,
            };

            if let Some(output_path) = &output_path {
                write_to_file(&content, output_path)?;
                info!("Successfully wrote OpenAPI document to {}", output_path.display());
            } else {
                println!("{}", content);
            }
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or(settings.bind);
            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            runtime.block_on(serve(DocsState::new(settings, apis), bind))?;
        }
        Command::BuildDocs => {
            let stdout = std::io::stdout();
            DocsBuilder::new(&settings, &apis).run(&mut stdout.lock())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let args = CliArgs::try_parse_from(["tastypie-openapi", "generate"]).unwrap();
        assert!(args.settings.is_none());
        assert!(!args.verbose);
        match args.command {
            Command::Generate {
                output_format,
                output_path,
                server_url,
            } => {
                assert!(matches!(output_format, OutputFormat::Json));
                assert!(output_path.is_none());
                assert!(server_url.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "tastypie-openapi",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "-v",
            "--settings",
            "docs.yaml",
        ])
        .unwrap();
        assert!(args.verbose);
        assert_eq!(args.settings, Some(PathBuf::from("docs.yaml")));
        match args.command {
            Command::Serve { bind } => assert_eq!(bind.unwrap().port(), 9000),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_build_docs_command() {
        let args = CliArgs::try_parse_from(["tastypie-openapi", "build-docs"]).unwrap();
        assert!(matches!(args.command, Command::BuildDocs));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["tastypie-openapi"]).is_err());
    }
}
