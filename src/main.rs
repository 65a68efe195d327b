mod app;
mod cli;

use app::HeadlessApp;
use cli::Opt;
use log::error;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use structopt::StructOpt;
use structopt_flags::LogLevel;

fn main() {
    let opt: Opt = Opt::from_args();

    if let Some(shell) = opt.completions {
        Opt::clap().gen_completions_to("glyph-bridge", shell, &mut std::io::stdout());
        return;
    }

    if let Err(e) = TermLogger::init(
        opt.verbose.get_level_filter(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let config = match opt.to_run_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = HeadlessApp::new(config).run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
