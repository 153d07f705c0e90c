use colored::Colorize;
use json_shape::cli::CommandLineInterface;
use tracing_subscriber::EnvFilter;

fn main() {
    let command_line_interface = CommandLineInterface::load();

    let default_level = match command_line_interface.verbosity() {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(error) = command_line_interface.run() {
        let error = anyhow::Error::from(error);
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
