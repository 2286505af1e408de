use std::time::Duration;

use autodraft::{
    app::{self, App},
    cli::Cli,
    config::Config,
};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use futures::executor;

fn main() -> Result<()> {
    bootstrap(|| {
        let args = Cli::parse();
        let config = Config::new().wrap_err("Failed to load configuration")?;

        executor::block_on(async {
            if args.list {
                return app::print_drafts(&config).await;
            }
            App::new(&args, &config).await?.run().await
        })
    })
}

fn bootstrap(fn_do_run: fn() -> Result<()>) -> Result<()> {
    autodraft::errors::init()?;
    autodraft::logging::init()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err_with(|| "Failed to start Tokio runtime")?;
    let result = {
        let _guard = runtime.enter();
        fn_do_run()
    };
    runtime.shutdown_timeout(Duration::from_secs(5));

    result
}
