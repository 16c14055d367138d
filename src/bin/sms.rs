use anyhow::Context;
use cudy_router::model::SmsBox;
use cudy_router::{logger, Client};
use log::LevelFilter;
use serde::Serialize;
use structopt::StructOpt;

/// Read and send text messages through the router's modem.
///
/// Connection settings come from CUDY_HOST, CUDY_USERNAME, CUDY_PASSWORD
/// and CUDY_PORT, or a .env file.
#[derive(Debug, StructOpt)]
#[structopt(name = "cudy-sms")]
enum Opt {
    /// Show message counters
    Summary,
    /// List the messages in a folder
    List {
        /// `inbox` or `outbox`
        #[structopt(default_value = "inbox")]
        sms_box: SmsBox,
    },
    /// Show one message
    Read {
        /// Handle from the `cfg` field of `list`
        cfg: String,
        /// `inbox` or `outbox`
        #[structopt(long = "box")]
        sms_box: Option<SmsBox>,
    },
    /// Send a message
    Send { phone: String, content: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    logger::init(LevelFilter::Warn).context("initialize logger")?;

    if let Err(err) = dotenv::dotenv() {
        log::debug!("couldn't load .env file: {:?}", err);
    }

    let client = Client::new(None, None, None, None)?;

    match opt {
        Opt::Summary => print_json(&client.sms_summary().await?),
        Opt::List { sms_box } => print_json(&client.sms_list(sms_box).await?),
        Opt::Read { cfg, sms_box } => print_json(&client.read_sms(&cfg, sms_box).await?),
        Opt::Send { phone, content } => {
            let page = client
                .send_sms(&phone, &content)
                .await
                .context("send sms")?;
            log::info!("router answered with {} bytes", page.len());
            println!("sent");
            Ok(())
        }
    }
}
