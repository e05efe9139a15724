use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = pgpmail::cli::Cli::parse();
    pgpmail::logging::init(cli.verbose);

    if let Err(err) = pgpmail::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
