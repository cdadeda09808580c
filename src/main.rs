use std::env;

#[tokio::main]
async fn main() {
    env_logger::init();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = runway::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("evaluate") => {
            // Keep the binary name as argv[0] for clap's usage output.
            let cli_args = raw_args
                .iter()
                .take(1)
                .chain(raw_args.iter().skip(2))
                .cloned();
            match runway::api::run_cli(cli_args) {
                Ok(report) => println!("{report}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("Usage: runway serve [port] | runway evaluate [--flags]");
            std::process::exit(1);
        }
    }
}
