use mock_server::AuthPolicy;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let tokens: Vec<String> = std::env::var("MOCK_API_TOKENS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    let token_count = tokens.len();
    let auth = if tokens.is_empty() {
        AuthPolicy::Open
    } else {
        AuthPolicy::bearer(tokens)
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, accepted_tokens = token_count, "listening");
    mock_server::run_with_auth(listener, auth).await
}
