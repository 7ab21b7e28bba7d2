use std::path::PathBuf;

use bytes::Bytes;
use clap::Parser;
use http::header::{CONTENT_TYPE, COOKIE};

use gospel::{App, HttpError, ServerConfig};

mod app;

/// Gospel demo - render one request against the demo application
#[derive(Parser, Debug)]
#[command(name = "gospel-demo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Request method
    #[arg(long, default_value = "GET")]
    method: String,

    /// URL-encoded form body
    #[arg(long)]
    body: Option<String>,

    /// Cookie header, e.g. the session pair printed by a previous run
    #[arg(long)]
    cookie: Option<String>,

    /// Server configuration as a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request path, including the query
    path: String,
}

fn run(args: Args) -> Result<(), HttpError> {
    let config = match &args.config {
        Some(path) => ServerConfig::from_json_file(path)?,
        None => ServerConfig::default(),
    };

    let mut request = http::Request::builder()
        .method(args.method.as_str())
        .uri(args.path.as_str());
    if args.body.is_some() {
        request = request.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    }
    if let Some(cookie) = &args.cookie {
        request = request.header(COOKIE, cookie.as_str());
    }
    let request = request.body(Bytes::from(args.body.unwrap_or_default()))?;

    let response = App::new(app::root).with_config(config).handle(request);

    println!("{:?} {}", response.version(), response.status());
    for (name, value) in response.headers() {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    println!();
    println!("{}", String::from_utf8_lossy(response.body()));
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
