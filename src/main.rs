use colored::Colorize;
use descgen::cli::CommandLineInterface;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let command_line_interface = CommandLineInterface::load();
    match command_line_interface.run() {
        Ok(report) if report.has_failures() => std::process::exit(2),
        Ok(_) => {}
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}
