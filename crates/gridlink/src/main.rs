mod cli;

use log::info;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    info!("gridlink {}", env!("CARGO_PKG_VERSION"));

    std::process::exit(cli::run(&args));
}
