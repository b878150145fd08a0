use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use jspantom_lsp::Backend;
use jspantom_lsp::logging::init_logger;

/// JSP language server speaking LSP over stdio.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Log filter (e.g. `debug`, `jspantom_lsp=trace`); defaults to RUST_LOG, then `info`.
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in log output.
    #[arg(long)]
    no_color: bool,

    /// Additional directory to search for TLD files.  May be repeated.
    #[arg(long = "tld-dir", value_name = "DIR")]
    tld_dirs: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logger(cli.no_color, cli.log_level.as_deref()) {
        eprintln!("failed to initialise logging: {err}");
    }
    info!("starting JSPantomLSP {}", env!("CARGO_PKG_VERSION"));

    let tld_dirs = cli.tld_dirs;
    let (service, socket) = LspService::new(|client| Backend::new_with_tld_dirs(client, tld_dirs));
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
}
