use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use memoria_config::Config;
use memoria_domain::{Scope, ScopeType};
use memoria_service::{MemoriaService, QueryRequest, TagFilter, adapters};
use memoria_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = memoria_cli::VERSION,
	rename_all = "kebab",
	styles = memoria_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 's', value_name = "TEXT")]
	pub search: Option<String>,
	/// Entry type to search; repeat for several. Defaults to every type.
	#[arg(long = "type", short = 't', value_name = "TYPE")]
	pub types: Vec<String>,
	#[arg(long, value_name = "SCOPE", default_value = "global")]
	pub scope_type: String,
	#[arg(long, value_name = "ID")]
	pub scope_id: Option<String>,
	/// Search only the named scope instead of walking out to its parents.
	#[arg(long)]
	pub no_inherit: bool,
	#[arg(long, short = 'n')]
	pub limit: Option<u32>,
	#[arg(long)]
	pub semantic: bool,
	#[arg(long)]
	pub fts5: bool,
	/// Tag every result must carry; repeatable.
	#[arg(long = "tag", value_name = "TAG")]
	pub tags: Vec<String>,
	#[arg(long)]
	pub compact: bool,
	#[arg(long)]
	pub telemetry: bool,
	/// Print one summary with its children and members instead of querying.
	#[arg(long, value_name = "SUMMARY_ID", conflicts_with = "search")]
	pub drill_down: Option<String>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = memoria_config::load(&args.config)?;

	init_tracing(&config)?;

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema(config.storage.qdrant.vector_dim).await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;
	let collaborators = adapters::default_collaborators(&config, Arc::new(db), Arc::new(qdrant));
	let service = MemoriaService::new(config, collaborators);
	let output = match &args.drill_down {
		Some(summary_id) => serde_json::to_string_pretty(&service.drill_down(summary_id).await?)?,
		None => {
			let request = build_request(&args)?;

			serde_json::to_string_pretty(&service.query(&request).await?)?
		},
	};

	println!("{output}");

	Ok(())
}

fn build_request(args: &Args) -> color_eyre::Result<QueryRequest> {
	let scope_type = ScopeType::parse(&args.scope_type)
		.ok_or_else(|| eyre::eyre!("Unknown scope type {:?}.", args.scope_type))?;
	let scope = Scope { scope_type, scope_id: args.scope_id.clone(), inherit: !args.no_inherit };
	let tags = (!args.tags.is_empty())
		.then(|| TagFilter { require: args.tags.clone(), ..Default::default() });

	Ok(QueryRequest {
		search: args.search.clone(),
		types: (!args.types.is_empty()).then(|| args.types.clone()),
		scope: Some(scope),
		limit: args.limit,
		semantic_search: args.semantic,
		use_fts5: args.fts5,
		tags,
		compact: args.compact,
		telemetry: args.telemetry,
		..Default::default()
	})
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();

	Ok(())
}
