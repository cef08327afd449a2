use schedule_preview::app::{run, PreviewConfig, PreviewRequest};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let config = PreviewConfig::from_env().unwrap_or_default();
    let request = match PreviewRequest::from_args(std::env::args().skip(1)) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    match run(&config, &request) {
        Ok(output) => print!("{output}"),
        Err(err) => {
            eprintln!("Failed to preview schedule: {err:#}");
            std::process::exit(1);
        }
    }
}
