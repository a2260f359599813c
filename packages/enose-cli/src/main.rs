use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let api_url = cli.api_url.as_deref();

    let exit_code = match cli.command {
        cli::Command::Monitor(args) => commands::monitor::execute(api_url, args).await,
        cli::Command::Ports(args) => commands::control::ports(api_url, args).await,
        cli::Command::Connect(args) => commands::control::connect(api_url, args).await,
        cli::Command::Start(args) => commands::control::start(api_url, args).await,
        cli::Command::Stop => commands::control::stop(api_url).await,
        cli::Command::Reset => commands::control::reset(api_url).await,
        cli::Command::Save(args) => commands::control::save(api_url, args).await,
        cli::Command::Session(args) => commands::control::session(api_url, args).await,
        cli::Command::Influx => commands::control::influx(api_url).await,
        cli::Command::Sim(command) => commands::sim::execute(api_url, command).await,
        cli::Command::Upload(args) => commands::upload::execute(api_url, args).await,
        cli::Command::ExportGnuplot(args) => commands::export_gnuplot::execute(api_url, args).await,
    };

    std::process::exit(exit_code);
}
