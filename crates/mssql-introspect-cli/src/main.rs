//! mssql-introspect CLI - SQL Server schema introspection.

use clap::{Parser, Subcommand};
use mssql_introspect::{
    IntrospectError, IntrospectionService, Loader, LoaderConfig, MssqlConnector, PropertyKind,
    SchemaSnapshot, TracingSink,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "mssql-introspect")]
#[command(about = "SQL Server schema introspection")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Introspect every model: property types, references and metadata
    Inspect {
        /// Write the schema to a file (.yaml/.yml for YAML, JSON otherwise)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List model names
    Models,

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), IntrospectError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(IntrospectError::ConfigurationInvalid)?;

    let config = LoaderConfig::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let service = IntrospectionService::mssql(Arc::new(TracingSink));

    match cli.command {
        Commands::HealthCheck => health_check(&service, &config, cli.output_json).await,

        Commands::Models => {
            service.prepare_with(&config).await?;
            let result = service.list_model_names().await;
            service.finalize().await?;
            let names = result?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in &names {
                    println!("{}", name);
                }
            }
            Ok(())
        }

        Commands::Inspect { output } => {
            service.prepare_with(&config).await?;
            let result = service.snapshot().await;
            service.finalize().await?;
            let snapshot = result?;

            if let Some(path) = output {
                write_snapshot(&snapshot, &path)?;
                println!("Wrote {} models to {}", snapshot.models.len(), path.display());
            } else if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
            Ok(())
        }
    }
}

async fn health_check(
    service: &IntrospectionService<MssqlConnector>,
    config: &LoaderConfig,
    output_json: bool,
) -> Result<(), IntrospectError> {
    let target = config.connection_parameters()?.display_target();

    let start = Instant::now();
    let result = service.prepare_with(config).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    service.finalize().await?;

    if output_json {
        let report = serde_json::json!({
            "target": target,
            "connected": result.is_ok(),
            "latencyMs": latency_ms,
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Health Check Results:");
        println!(
            "  SQL Server {}: {} ({}ms)",
            target,
            if result.is_ok() { "OK" } else { "FAILED" },
            latency_ms
        );
        if let Err(ref err) = result {
            println!("    Error: {}", err);
        }
    }

    result
}

fn write_snapshot(snapshot: &SchemaSnapshot, path: &Path) -> Result<(), IntrospectError> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let content = if is_yaml {
        serde_yaml::to_string(snapshot)?
    } else {
        serde_json::to_string_pretty(snapshot)?
    };
    std::fs::write(path, content)?;
    Ok(())
}

fn print_snapshot(snapshot: &SchemaSnapshot) {
    for model in &snapshot.models {
        println!(
            "{}.{}",
            model.metadata.schema_name, model.metadata.table_name
        );
        for (name, property) in &model.properties {
            let mut facets = Vec::new();
            if property.is_primary_key {
                facets.push("primary key".to_string());
            }
            if property.nullable {
                facets.push("nullable".to_string());
            }
            match &property.kind {
                PropertyKind::Integer {
                    autogenerate: Some(auto),
                    ..
                } => facets.push(format!("identity({},{})", auto.seed, auto.increment)),
                PropertyKind::String {
                    max_length: Some(len),
                    ..
                }
                | PropertyKind::Binary {
                    max_length: Some(len),
                    ..
                } => facets.push(format!("length {}", len)),
                PropertyKind::Decimal {
                    precision, scale, ..
                } => facets.push(format!("({},{})", precision, scale)),
                _ => {}
            }
            if let Some(default) = property.default_expression() {
                facets.push(format!("default {}", default));
            }
            println!(
                "  {:<30} {:<16} {}",
                name,
                property.type_name(),
                facets.join(", ")
            );
        }
        for unsupported in &model.unsupported_properties {
            println!(
                "  {:<30} {:<16} unsupported",
                unsupported.name, unsupported.data_type
            );
        }
        for (name, reference) in &model.references {
            println!(
                "  -> {} ({}) references {}",
                name,
                reference.local_property(),
                reference.target_model
            );
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
