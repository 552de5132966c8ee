use clap::Parser;
use std::time::Duration;

use typesense_sync::config::{
    CallbackConfig, DEFAULT_FAILED_BATCH_LOG, DEFAULT_TYPESENSE_HOST, PaginationTuning,
    SourceSettings, SyncConfig, TypesenseConfig, optional_path,
};
use typesense_sync::{SourceBackend, SyncError, TypesenseClient, init_logger, run_sync};

#[derive(Parser, Debug)]
#[command(
    name = "typesense-sync",
    about = "Copy a Postgres or Supabase table into a Typesense collection"
)]
struct Args {
    /// Source table, optionally schema-qualified (`public.companies`).
    table_name: String,

    /// Target Typesense collection.
    collection_name: String,

    /// Initial extraction page size; adjusted while running.
    #[arg(long, default_value_t = 2500)]
    chunk_size: usize,

    /// Column to use as the default sorting field.
    #[arg(long)]
    id_column: Option<String>,

    /// Stop after this many rows.
    #[arg(long)]
    global_limit: Option<usize>,

    #[arg(long, default_value_t = 50)]
    batch_size: usize,

    /// Batches indexed concurrently.
    #[arg(long, default_value_t = 20)]
    concurrency: usize,

    /// Drop the collection before doing anything else.
    #[arg(long)]
    drop_collection: bool,

    /// Direct Postgres connection string; wins over Supabase credentials.
    #[arg(long, visible_alias = "postgresql-url", env = "POSTGRESQL_URL")]
    pg_uri: Option<String>,

    /// Session statement_timeout for the Postgres source.
    #[arg(long)]
    statement_timeout_ms: Option<u64>,

    #[arg(long, env = "SUPABASE_PROJECT_REF")]
    supabase_project_ref: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    supabase_anon_key: Option<String>,

    /// Full Supabase URL, used instead of the project ref when given.
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    #[arg(long, env = "TYPESENSE_HOST", default_value = DEFAULT_TYPESENSE_HOST)]
    typesense_host: String,

    #[arg(long, env = "TYPESENSE_API_KEY", hide_env_values = true, default_value = "")]
    typesense_api_key: String,

    /// JSONL file receiving failed batches; empty disables it.
    #[arg(long, default_value = DEFAULT_FAILED_BATCH_LOG)]
    failed_batch_log: String,

    /// URL notified after every indexed batch.
    #[arg(long)]
    callback_url: Option<String>,

    /// Extra callback header as 'Key:Value'; can repeat.
    #[arg(long = "callback-header")]
    callback_headers: Vec<String>,

    /// Where to write the inferred field list; defaults to `<collection>_fields.txt`.
    #[arg(long)]
    fields_file: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<SyncConfig, SyncError> {
        let source = SourceSettings::resolve(
            self.pg_uri,
            self.statement_timeout_ms.map(Duration::from_millis),
            self.supabase_url,
            self.supabase_project_ref,
            self.supabase_anon_key,
        )?;

        let typesense = TypesenseConfig::new(self.typesense_host, self.typesense_api_key);
        let mut config = SyncConfig::new(self.table_name, self.collection_name, source, typesense);

        config.page_size = self.chunk_size;
        config.global_limit = self.global_limit;
        config.sort_field = self.id_column;
        config.batch_size = self.batch_size;
        config.concurrency = self.concurrency;
        config.drop_collection = self.drop_collection;
        config.failed_batch_log = optional_path(&self.failed_batch_log);
        if let Some(fields_file) = self.fields_file {
            config.fields_file = optional_path(&fields_file);
        }
        config.callback = CallbackConfig::new(
            self.callback_url.as_deref().unwrap_or_default(),
            &self.callback_headers,
        )?;
        config.pagination = PaginationTuning::from_env();

        config.validate()?;
        Ok(config)
    }
}

async fn run(args: Args) -> Result<(), SyncError> {
    let config = args.into_config()?;
    let source = SourceBackend::connect(&config.source).await?;
    let client = TypesenseClient::new(&config.typesense).map_err(SyncError::SinkSetup)?;

    log::info!(
        "syncing '{}' from {} source into '{}' at {}",
        config.table_name,
        source.kind(),
        config.collection_name,
        client.base_url()
    );

    let report = run_sync(&source, &client, &config).await?;
    log::info!(
        "sync finished: {} rows extracted, {} batches, {} failed, {} documents indexed",
        report.extracted_rows,
        report.metrics.total_batches,
        report.metrics.failed_batches,
        report.metrics.successful_documents
    );
    if let Ok(summary) = serde_json::to_string(&report.metrics) {
        println!("{summary}");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logger();
    let args = Args::parse();

    if let Err(err) = run(args).await {
        log::error!("sync failed: {err}");
        std::process::exit(1);
    }
}
