use clap::error::ErrorKind;
use clap::Parser;
use std::process;

mod cli;
mod models;
mod project;
mod services;
mod settings;

use cli::{commands, CommandArgs, EXIT_INVALID_ARGS, EXIT_OK};
use settings::Settings;

fn main() {
    let args = match CommandArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
                _ => EXIT_INVALID_ARGS,
            };
            process::exit(code);
        }
    };

    let settings = Settings::from_args(&args);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_filter())).init();
    log::debug!("Settings: {:?}", settings);

    let code = match commands::run(&args.command, &settings) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            log::debug!("{:?}", err);
            eprintln!("❌ {}: {}", args.command.failure_prefix(), err);
            err.exit_code()
        }
    };
    process::exit(code);
}
