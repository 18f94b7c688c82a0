use clap::Parser;
use stepflow::cli::{self, Args, EXIT_PRE_RUN_ERROR};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let code = match cli::run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("stepflow: {:#}", err);
            EXIT_PRE_RUN_ERROR
        }
    };
    std::process::exit(code);
}
