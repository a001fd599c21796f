use clap::Parser;

use hubspace::cli::ClassicArgs;
use hubspace::{app, exit_code, logging};

#[tokio::main]
async fn main() {
    let args = ClassicArgs::try_parse().unwrap_or_else(|err| {
        let code = if err.use_stderr() {
            exit_code::GENERAL
        } else {
            exit_code::SUCCESS
        };
        let _ = err.print();
        std::process::exit(code);
    });

    let result = if args.sanity_check {
        app::print_ready().await
    } else {
        logging::init_tracing(args.common.verbose, args.common.log_json);
        app::run_classic(args).await
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
