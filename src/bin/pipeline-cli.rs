use clap::{Parser, Subcommand};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_ENCODING};
use serde_json::{json, Value};

use request_pipeline::codec::{compress_to_vec, decompress_to_vec, CodecRegistry};

#[derive(Parser)]
#[command(name = "pipeline-cli")]
#[command(about = "Client for the request pipeline demo server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token attached to signed requests.
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Obtain a token for a demo user
    Login {
        #[arg(default_value = "Admin")]
        username: String,
        #[arg(default_value = "Pass")]
        password: String,
    },
    /// Signed GET of an API path, e.g. /api/values
    Get {
        path: String,
        /// Ask for a compressed response (gzip, deflate, lz4)
        #[arg(short, long)]
        accept: Option<String>,
    },
    /// Send text to /api/echo, optionally compressed
    Echo {
        text: String,
        /// Content-Encoding for the request body (gzip, deflate, lz4)
        #[arg(short, long)]
        encoding: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let registry = CodecRegistry::with_defaults();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
    }

    match cli.command {
        Commands::Login { username, password } => {
            let res = client
                .post(format!("{}/api/login", cli.url))
                .json(&json!({ "username": username, "password": password }))
                .send()
                .await?;
            print_response(res, &registry).await?;
        }
        Commands::Get { path, accept } => {
            if let Some(accept) = accept {
                headers.insert(ACCEPT_ENCODING, HeaderValue::from_str(&accept)?);
            }
            let res = client
                .get(signed_url(&cli.url, &path))
                .headers(headers)
                .send()
                .await?;
            print_response(res, &registry).await?;
        }
        Commands::Echo { text, encoding } => {
            let body = match &encoding {
                Some(token) => {
                    let codec = registry
                        .find(token)
                        .ok_or_else(|| format!("unknown encoding: {}", token))?;
                    headers.insert(CONTENT_ENCODING, HeaderValue::from_static(codec.encoding()));
                    compress_to_vec(codec.as_ref(), text.as_bytes())?
                }
                None => text.into_bytes(),
            };
            let res = client
                .post(signed_url(&cli.url, "/api/echo"))
                .headers(headers)
                .body(body)
                .send()
                .await?;
            print_response(res, &registry).await?;
        }
    }

    Ok(())
}

/// `path` plus a fresh nonce, the current timestamp and a signature.
fn signed_url(base: &str, path: &str) -> String {
    let mut rng = rand::thread_rng();
    let nonce: i32 = rng.gen_range(0..i32::MAX);
    let timestamp = chrono::Utc::now().timestamp() as i32;
    let signature: String = (&mut rng).sample_iter(&Alphanumeric).take(32).map(char::from).collect();

    let separator = if path.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}nonce={}&timestamp={}&signature={}",
        base, path, separator, nonce, timestamp, signature
    )
}

async fn print_response(
    res: reqwest::Response,
    registry: &CodecRegistry,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let codec = res
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .and_then(|token| registry.find(token));
    let raw = res.bytes().await?;
    let body = match codec {
        Some(codec) => decompress_to_vec(codec.as_ref(), &raw)?,
        None => raw.to_vec(),
    };

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        eprintln!("Response: {}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", String::from_utf8_lossy(&body)),
    }
    Ok(())
}
