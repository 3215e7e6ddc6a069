#[macro_use]
extern crate log;

use std::process;
use x4c::cli::process_cli_action;
use x4c::config::CONFIG;
use x4c::error::{is_decode_error, is_input_error};
use x4c::tzkt::TzKTClient;

fn exit_code(err: &anyhow::Error) -> i32 {
    if is_input_error(err) {
        2
    } else if is_decode_error(err) {
        3
    } else {
        1
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let config = match &*CONFIG {
        Ok(config) => config,
        Err(e) => {
            error!("invalid arguments: {:?}", e);
            process::exit(exit_code(e));
        }
    };
    let action = match &config.action {
        Some(action) => action,
        None => {
            error!("no command given, see --help");
            process::exit(2);
        }
    };

    let indexer =
        TzKTClient::new(config.tzkt_url.clone(), config.indexer_comm_retries);
    if let Err(e) = process_cli_action(config, &indexer, action) {
        error!("{:?}", e);
        process::exit(exit_code(&e));
    }
}
