use reposync::cli::{self, Cli};
use reposync::logging::init_logging;
use reposync::ui::output::{self, Verbosity};

fn main() {
    let cli = Cli::parse_args();
    init_logging(Verbosity::from_flags(cli.quiet, cli.debug));

    if let Err(err) = cli::run(cli) {
        output::error(format!("{err:#}"));
        std::process::exit(1);
    }
}
