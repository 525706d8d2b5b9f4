use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use submission_engine::application::file_payment::{FileSubmissionService, FileUpload};
use submission_engine::application::submission::{IdempotentSubmissionService, SubmissionPolicy};
use submission_engine::config::EngineConfig;
use submission_engine::domain::file::{FileConsentTotals, FilePayment};
use submission_engine::domain::payment::ControlSum;
use submission_engine::domain::ports::SubmissionStoreRef;
use submission_engine::domain::version::ApiVersion;
use submission_engine::infrastructure::in_memory::InMemorySubmissionStore;
use submission_engine::interfaces::codec::registry::PaymentFileCodecRegistry;
use submission_engine::logging::init_logging;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the configuration file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the supported payment file types
    FileTypes,

    /// Parse a bulk payment file and print the result as JSON
    Parse {
        #[arg(long)]
        file_type: String,

        /// Bulk payment file
        input: PathBuf,
    },

    /// Submit bulk payment files in order under one consent and idempotency key
    Submit {
        #[arg(long)]
        file_type: String,

        #[arg(long)]
        content_type: String,

        #[arg(long)]
        consent_id: String,

        #[arg(long)]
        client_id: String,

        #[arg(long)]
        idempotency_key: String,

        #[arg(long, default_value = "v3.1.10")]
        api_version: ApiVersion,

        /// Number of transactions declared by the consent
        #[arg(long, requires = "expected_control_sum")]
        expected_count: Option<usize>,

        /// Control sum declared by the consent
        #[arg(long, requires = "expected_count")]
        expected_control_sum: Option<Decimal>,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Bulk payment files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_logging(&config);

    let registry = Arc::new(PaymentFileCodecRegistry::with_defaults().into_diagnostic()?);

    match cli.command {
        Command::FileTypes => {
            let mut writer = csv::Writer::from_writer(io::stdout().lock());
            writer
                .write_record(["file_type", "content_type"])
                .into_diagnostic()?;
            for file_type in registry.file_types() {
                writer
                    .write_record([&file_type.file_type, &file_type.content_type])
                    .into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
        Command::Parse { file_type, input } => {
            let content = std::fs::read(input).into_diagnostic()?;
            let file = registry
                .process_file(&file_type, &content)
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&file).into_diagnostic()?
            );
        }
        Command::Submit {
            file_type,
            content_type,
            consent_id,
            client_id,
            idempotency_key,
            api_version,
            expected_count,
            expected_control_sum,
            db_path,
            inputs,
        } => {
            if let Some(db_path) = db_path {
                config.db_path = Some(db_path);
            }
            let submissions = IdempotentSubmissionService::new(
                open_store(&config)?,
                SubmissionPolicy::SingleResourcePerConsent,
            )
            .with_store_timeout(config.store_timeout());
            let service = FileSubmissionService::new(registry, submissions);

            let expected = match (expected_count, expected_control_sum) {
                (Some(number_of_transactions), Some(control_sum)) => Some(FileConsentTotals {
                    number_of_transactions,
                    control_sum: ControlSum(control_sum),
                    file_hash: None,
                }),
                _ => None,
            };

            for input in inputs {
                let content = match std::fs::read(&input) {
                    Ok(content) => content,
                    Err(e) => {
                        eprintln!("Error reading {}: {}", input.display(), e);
                        continue;
                    }
                };
                let upload = FileUpload {
                    file_type: file_type.clone(),
                    content_type: content_type.clone(),
                    content,
                    consent_id: consent_id.clone(),
                    api_client_id: client_id.clone(),
                    idempotency_key: idempotency_key.clone(),
                    api_version,
                    expected: expected.clone(),
                };
                match service.submit_file(upload).await {
                    Ok(submission) => {
                        println!("{}", serde_json::to_string(&submission).into_diagnostic()?);
                    }
                    Err(e) => {
                        eprintln!("Error submitting {}: {}", input.display(), e);
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(config: &EngineConfig) -> Result<SubmissionStoreRef<FilePayment>> {
    use submission_engine::infrastructure::rocksdb::RocksDbSubmissionStore;

    match &config.db_path {
        Some(db_path) => {
            let store = RocksDbSubmissionStore::<FilePayment>::open(db_path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemorySubmissionStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(config: &EngineConfig) -> Result<SubmissionStoreRef<FilePayment>> {
    if config.db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(Arc::new(InMemorySubmissionStore::new()))
}
