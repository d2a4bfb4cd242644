use anyhow::{bail, Context};
use redis_geo::{CancellationToken, Client, ClientConfig, Command};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: redis-geo [-c CONFIG] [-u URL] COMMAND [ARG ...]";

struct Invocation {
    config_file: Option<String>,
    url: Option<String>,
    command: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Option<Invocation>> {
    let mut invocation = Invocation {
        config_file: None,
        url: None,
        command: Vec::new(),
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if !invocation.command.is_empty() {
            invocation.command.push(arg);
            continue;
        }
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-c" | "--config" => invocation.config_file = Some(args.next().context("-c needs a file path")?),
            "-u" | "--url" => invocation.url = Some(args.next().context("-u needs a URL")?),
            flag if flag.starts_with('-') => bail!("unknown option '{}'\n{}", flag, USAGE),
            _ => invocation.command.push(arg),
        }
    }

    if invocation.command.is_empty() {
        bail!("missing command\n{}", USAGE);
    }
    Ok(Some(invocation))
}

fn load_config(invocation: &Invocation) -> anyhow::Result<ClientConfig> {
    match (&invocation.config_file, &invocation.url) {
        (Some(_), Some(_)) => bail!("-c and -u are mutually exclusive"),
        (Some(path), None) => ClientConfig::from_file(path),
        (None, Some(url)) => ClientConfig::from_url(url),
        (None, None) => Ok(ClientConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pure JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    let Some(invocation) = parse_args(std::env::args().skip(1))? else {
        println!("{}", USAGE);
        return Ok(());
    };
    let config = load_config(&invocation)?;
    info!("Sending {} to {}", invocation.command[0], config.addr());

    let client = Client::connect(config);
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let reply = client
        .execute(Command::raw(&invocation.command), &cancel)
        .await
        .with_context(|| format!("{} failed", invocation.command[0]))?;
    println!("{}", serde_json::to_string_pretty(&reply)?);

    Ok(())
}
