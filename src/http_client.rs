//! # Shared HTTP Client
//!
//! One `reqwest::Client` per process, reused for connection pooling rather
//! than constructed per request (spec §5, "HTTP client reuse").

use once_cell::sync::OnceCell;
use std::time::Duration;

static CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

/// Return the process-wide HTTP client, building it on first use with the
/// given default timeout. Later calls with a different `timeout` are
/// ignored — the client is built once; per-request timeouts are applied via
/// `tokio::time::timeout` around individual calls instead.
pub fn shared_client(timeout: Duration) -> reqwest::Client {
    CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(5))
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("failed to build shared HTTP client")
        })
        .clone()
}
