use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = memoria_query::Args::parse();

	memoria_query::run(args).await
}
