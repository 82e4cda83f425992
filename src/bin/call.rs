use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use streamrpc::Options;
use streamrpc::codec::CodecType;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let addr = std::env::var("RPC_ADDR").unwrap_or_else(|_| "tcp@127.0.0.1:7001".to_string());
    let method = std::env::var("RPC_METHOD").context("RPC_METHOD must name Service.Method")?;
    let args = std::env::var("RPC_ARGS").unwrap_or_else(|_| "null".to_string());
    let timeout_ms: u64 = match std::env::var("RPC_TIMEOUT_MS") {
        Ok(ms) => ms.parse().context("RPC_TIMEOUT_MS must be milliseconds")?,
        Err(_) => 5_000,
    };

    let args: Value = serde_json::from_str(&args).context("RPC_ARGS must be JSON")?;
    let opts = Options::default().with_codec_type(CodecType::JSON);

    println!("Calling {method} on {addr}");

    let client = streamrpc::xdial(&addr, Some(opts)).await?;
    let reply: Value = client
        .call_with_timeout(&method, &args, Duration::from_millis(timeout_ms))
        .await?;

    println!("{}", serde_json::to_string_pretty(&reply)?);

    client.close().await?;
    Ok(())
}
