use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = quarry_eval::Args::parse();
	quarry_eval::run(args).await
}
