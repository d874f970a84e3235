//! Transport: builds the one `reqwest::Client` a run's workers all share.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::plan::TransportOptions;
use crate::timing::TimingResolver;

/// Builds a `reqwest::Client` per the §4.1 contract. Constructed once per
/// run; never mutated afterward, so it is safe to share across workers
/// behind an `Arc` (reqwest's own internal connection pool is already
/// `Clone`-cheap, but the explicit `Arc` keeps ownership unambiguous here).
pub fn build_transport(
    options: &TransportOptions,
    request_timeout: Duration,
) -> reqwest::Result<Arc<reqwest::Client>> {
    let mut builder = reqwest::Client::builder().dns_resolver(Arc::new(TimingResolver));

    if options.insecure_skip_verify {
        info!("transport: TLS peer verification disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    if options.disable_keepalives {
        builder = builder.pool_max_idle_per_host(0);
    }

    if options.disable_compression {
        builder = builder
            .no_gzip()
            .no_brotli()
            .no_deflate();
    }

    if options.disable_redirects {
        builder = builder.redirect(reqwest::redirect::Policy::none());
    }

    if options.enable_h2 {
        builder = builder.http2_prior_knowledge();
    }

    if !request_timeout.is_zero() {
        builder = builder.timeout(request_timeout);
    }

    if let Some(proxy_url) = &options.proxy_url {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        builder = builder.proxy(proxy);
    }

    Ok(Arc::new(builder.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_build_a_client() {
        let client = build_transport(&TransportOptions::default(), Duration::ZERO);
        assert!(client.is_ok());
    }

    #[test]
    fn bad_proxy_url_is_rejected() {
        let opts = TransportOptions {
            proxy_url: Some("not a url".to_string()),
            ..TransportOptions::default()
        };
        let client = build_transport(&opts, Duration::ZERO);
        assert!(client.is_err());
    }
}
