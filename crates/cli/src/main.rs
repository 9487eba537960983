use crate::error::CliError;
use clap::Parser;
use commands::Commands;
use connectors::{
    adapter::Adapter,
    sql::base::{capabilities::CapabilityCache, probe::{CapabilityProbe, CaseSensitivityProbe}},
};
use model::query::{compiled::CompiledQuery, request::QueryRequest};
use planner::{
    compiler::QueryCompiler,
    query::{
        capabilities::{BackendKind, DialectCapabilities},
        dialect::dialect_for,
    },
    schema::Schema,
    settings::{CaseProbeSettings, CompilerSettings},
};
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(name = "filterc", version = "0.0.1", about = "Filter to SQL compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            schema,
            request,
            backend,
            settings,
            case_insensitive,
            output,
        } => {
            let inputs = load_inputs(&schema, &request, settings.as_deref()).await?;
            let kind = BackendKind::from_str(&backend)?;
            let mut caps = DialectCapabilities::for_backend(&kind)?;
            if case_insensitive {
                caps = caps.with_case_insensitive(true);
            }

            let compiled = inputs.compile(&caps)?;
            output::write_json(&compiled, output).await?;
        }
        Commands::Run {
            conn_str,
            schema,
            request,
            settings,
            output,
        } => {
            let inputs = load_inputs(&schema, &request, settings.as_deref()).await?;
            let adapter = Adapter::sql(&BackendKind::Sqlite, &conn_str).await?;
            let probe = inputs
                .settings
                .case_probe
                .as_ref()
                .map(CaseSensitivityProbe::new);
            let caps = CapabilityCache::global()
                .resolve(
                    &conn_str,
                    adapter.get_sql(),
                    probe
                        .as_ref()
                        .map(|p| p as &(dyn CapabilityProbe + Send + Sync)),
                )
                .await?;

            let compiled = inputs.compile(&caps)?;
            let rows = adapter.get_sql().fetch(&compiled).await?;
            info!("Fetched {} rows", rows.len());
            output::write_json(&rows, output).await?;
        }
        Commands::Probe {
            conn_str,
            table,
            column,
        } => {
            let adapter = Adapter::sql(&BackendKind::Sqlite, &conn_str).await?;
            let probe = CaseSensitivityProbe::new(&CaseProbeSettings { table, column });
            let caps = CapabilityCache::global()
                .resolve(&conn_str, adapter.get_sql(), Some(&probe))
                .await?;
            println!(
                "{}",
                if caps.case_insensitive {
                    "case-insensitive"
                } else {
                    "case-sensitive"
                }
            );
        }
    }

    Ok(())
}

struct Inputs {
    schema: Schema,
    request: QueryRequest,
    settings: CompilerSettings,
}

impl Inputs {
    fn compile(&self, caps: &DialectCapabilities) -> Result<CompiledQuery, CliError> {
        let dialect = dialect_for(&caps.backend)?;
        let compiled = QueryCompiler::new(&self.schema, dialect.as_ref(), caps)
            .with_settings(self.settings.clone())
            .compile(&self.request)?;
        Ok(compiled)
    }
}

async fn load_inputs(
    schema: &str,
    request: &str,
    settings: Option<&str>,
) -> Result<Inputs, CliError> {
    let schema = Schema::from_json(&tokio::fs::read_to_string(schema).await?)?;
    let request = serde_json::from_str(&tokio::fs::read_to_string(request).await?)?;
    let settings = match settings {
        Some(path) => CompilerSettings::from_json(&tokio::fs::read_to_string(path).await?)?,
        None => CompilerSettings::default(),
    };
    Ok(Inputs {
        schema,
        request,
        settings,
    })
}
