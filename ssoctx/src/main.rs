use anyhow::Result;
use clap::Parser;

use ssoctx::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logging = ssoctx::logging::init_logging(cli.debug, cli.json)?;

    ssoctx::commands::run(cli).await
}
