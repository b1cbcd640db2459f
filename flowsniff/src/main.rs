use anyhow::Result;
use clap::Parser;
use flowsniff::{
    app::{self, Application},
    cmd::{Cmd, SubCmd},
    config::Settings,
};
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cmd::parse();
    env_logger::Builder::new()
        .parse_filters(&cmd.verbose)
        .init();

    let settings = match &cmd.sub_cmd {
        SubCmd::Check => return app::check(&cmd.ifaces),
        SubCmd::Live => Settings::from_cmd(&cmd)?,
        SubCmd::Run(run) => {
            let mut settings = Settings::load_config_path(&run.config)?;
            settings.merge_cmd(&cmd);
            settings.check()?;
            settings
        }
    };
    settings.check_ifaces()?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received ctrl-c"),
            Err(e) => error!("failed to listen for ctrl-c by error: {}", e),
        }
    };

    let report = Application::new(settings)?.run(shutdown).await?;
    report.log_summary();

    Ok(())
}
