use std::{env, process};

use log::{error, info};
use socks5relay::config::Config;
use socks5relay::proxy::run_socks5_proxy;
use tokio::runtime::Runtime;

fn main() {
    let mut args = env::args();
    if args.len() > 2 {
        let program = args.next().unwrap_or_else(|| "socks5relay".to_string());
        println!("Usage: {} [config.toml]", program);
        return;
    }

    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match args.nth(1) {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}: {}", path, e);
                process::exit(1);
            }
        },
        None => Config::default(),
    };
    info!("{:?}", config);

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("runtime error: {}", e);
            process::exit(1);
        }
    };

    rt.block_on(async move {
        if let Err(e) = run_socks5_proxy(&config).await {
            error!("SOCKS5 proxy error: {}", e);
            process::exit(1);
        }
    });
}
