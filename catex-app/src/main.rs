mod app;
mod cli;
mod logging;
mod surface;
mod window;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init_logging();

    app::App::new(cli).run()
}
