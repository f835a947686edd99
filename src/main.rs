pub use error::Error;
mod conf;
mod db;
mod error;
mod rest;
mod server;
mod service;
#[cfg(test)]
mod test;

use std::env;
use tracing_subscriber::EnvFilter;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let conf = conf::Conf::from_env();

    let mut conn = db::open_connection(&conf)?;
    db::migrate(&mut conn)?;
    drop(conn);

    let args: Vec<String> = env::args().collect();

    let command = match args.get(1) {
        Some(some) => some,
        None => Err(Error::Cli("No actions passed".into()))?,
    };

    match command.as_str() {
        "server" => server::run(conf).await?,
        "sync" => service::sync::run_cli(&conf).await?,
        "db" => db::cli(&args[2..], &conf)?,
        first_arg => Err(Error::Cli(format!("Unknown command: {first_arg}")))?,
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
