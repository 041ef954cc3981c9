mod cli;
mod esplora;
mod fetch;
mod hash160;
mod ledger;
mod routes;
mod state;

use std::sync::Arc;

use clap::Parser;

use crate::cli::Args;
use crate::esplora::EsploraClient;
use crate::state::AppState;

fn main() -> anyhow::Result<()> {
    smolscale::block_on(async {
        let log_conf =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "addrledgerd=debug,warn".into());
        std::env::set_var("RUST_LOG", log_conf);
        tracing_subscriber::fmt::init();

        let args = Args::parse();
        let (output_config, dry_run) = (args.output_config, args.dry_run);
        let config = args.into_config()?;
        if output_config {
            println!("{}", serde_yaml::to_string(&config)?);
            return Ok(());
        }
        if dry_run {
            log::info!("dry run with {:?}", config);
            return Ok(());
        }

        let policy = config.fetch_policy();
        let explorer = EsploraClient::new(&config.upstream, policy.timeout)?;
        log::info!("aggregating {}", config.upstream);
        let state = AppState::new(Arc::new(explorer), policy);

        let app = routes::server(Arc::new(state), &config.allowed_origins);
        log::info!("listening on {}", config.listen);
        app.listen(config.listen).await?;
        Ok(())
    })
}
