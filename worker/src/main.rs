use std::io;

use log::{error, info};
use tokio::signal;

use worker::{TrainingConfig, launch};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let cfg = TrainingConfig::from_env()?;
    info!(workers = cfg.world_size().get(), steps = cfg.steps.get(); "starting training");

    tokio::select! {
        ret = launch::run(cfg) => {
            if let Err(e) = ret {
                error!("training failed: {e}");
                return Err(e.into());
            }
            info!("wrapping up");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGINT");
        }
    }

    Ok(())
}
