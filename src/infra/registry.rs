//! Registry reachability probe
//!
//! A cheap `GET /v2/` before a registry URL is stored, so typos surface
//! at `init` time instead of at the first push.

use std::time::Duration;

use crate::config::defaults::REGISTRY_PROBE_TIMEOUT;

/// Whether something registry-shaped answers at `url`.
///
/// Any HTTP response counts as alive; an unauthenticated registry
/// answers 200 and an authenticated one 401, both of which prove the
/// endpoint exists.
pub fn registry_alive(url: &str) -> bool {
    probe(url, Duration::from_secs(REGISTRY_PROBE_TIMEOUT))
}

fn probe(url: &str, timeout: Duration) -> bool {
    let endpoint = if url.starts_with("http://") || url.starts_with("https://") {
        format!("{url}/v2/")
    } else {
        format!("http://{url}/v2/")
    };

    tracing::info!("probing registry at {endpoint}");
    let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("could not build probe client: {e}");
            return false;
        }
    };

    match client.get(&endpoint).send() {
        Ok(response) => {
            tracing::debug!("registry answered {}", response.status());
            true
        }
        Err(e) => {
            tracing::warn!("registry probe failed: {e}");
            false
        }
    }
}
