use std::time::Duration;

use anyhow::Context;
use cudy_router::{logger, Client, DeviceFilter};
use log::LevelFilter;
use tokio::time::MissedTickBehavior;

/// Pause between polls, 60 seconds unless configured. Zero is refused since
/// the interval can't tick without a period.
fn refresh_pause(value: Option<&str>) -> anyhow::Result<Duration> {
    let pause_seconds = value
        .unwrap_or("60")
        .trim()
        .parse::<u64>()
        .context("parse CUDY_REFRESH_PAUSE_SECONDS")?;
    if pause_seconds == 0 {
        anyhow::bail!("CUDY_REFRESH_PAUSE_SECONDS must be at least 1");
    }
    Ok(Duration::from_secs(pause_seconds))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    logger::init(LevelFilter::Info).context("initialize logger")?;

    match dotenv::dotenv() {
        Ok(path) => log::info!("loaded .env from {}", path.display()),
        Err(err) => log::warn!("couldn't load .env file: {:?}", err),
    };

    let mut interval = {
        let pause = refresh_pause(dotenv::var("CUDY_REFRESH_PAUSE_SECONDS").ok().as_deref())?;

        let mut interval = tokio::time::interval(pause);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    };

    let filter = dotenv::var("CUDY_DEVICES")
        .unwrap_or_default()
        .parse::<DeviceFilter>()
        .context("parse CUDY_DEVICES")?;

    let client = Client::new(None, None, None, None)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("received ctrl+c signal");
                break;
            }
            _ = interval.tick() => {}
        }

        // the router may be rebooting, so a failed poll just waits for the
        // next tick
        match client.data(&filter).await {
            Ok(data) => {
                let json = serde_json::to_string(&data).context("serialize router data")?;
                println!("{}", json);
            }
            Err(err) => log::warn!("couldn't fetch router data: {}", err),
        }
    }

    Ok(())
}
