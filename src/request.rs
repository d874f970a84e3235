//! Request factory (§4.2): produces one independent, mutable request per
//! call. Two variants: a static clone of a canonical request, and a
//! templated variant that resolves placeholder tokens on each call.
//!
//! The templated grammar is not part of the core contract — it is supplied
//! here as one concrete, pluggable implementation of `RequestFactory`.

use bytes::Bytes;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};

/// A request instance ready to be handed to the transport. Headers are
/// owned outright (never aliased with another instance); the body is a
/// cheap `Bytes` clone of the canonical body (or a freshly rendered one,
/// for templated factories).
#[derive(Debug, Clone)]
pub struct BuiltRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Produces one request instance per call. Must be safe to call
/// concurrently from multiple workers (§5's shared-resource policy).
pub trait RequestFactory: Send + Sync {
    fn next_request(&self) -> BuiltRequest;
}

/// Canonical request template. Suffixes a default `User-Agent` (§6) onto
/// the canonical headers once, at construction time, so every produced
/// request inherits it without per-call work.
#[derive(Debug, Clone)]
pub struct Canonical {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

const DEFAULT_USER_AGENT_SUFFIX: &str = "hey/0.0.1";

impl Canonical {
    pub fn new(method: Method, url: Url, mut headers: HeaderMap, body: Option<Bytes>) -> Self {
        if !headers.contains_key(reqwest::header::USER_AGENT) {
            headers.insert(
                reqwest::header::USER_AGENT,
                DEFAULT_USER_AGENT_SUFFIX.parse().expect("static UA string"),
            );
        }
        Self {
            method,
            url,
            headers,
            body,
        }
    }
}

/// Clones the canonical request on every call. Headers are deep-copied
/// (`HeaderMap::clone` owns its own entries) so per-request mutations never
/// alias; the body is a `Bytes` clone, which is a refcount bump over the
/// same backing allocation, not a copy.
pub struct StaticRequestFactory {
    canonical: Canonical,
}

impl StaticRequestFactory {
    pub fn new(canonical: Canonical) -> Self {
        Self { canonical }
    }
}

impl RequestFactory for StaticRequestFactory {
    fn next_request(&self) -> BuiltRequest {
        BuiltRequest {
            method: self.canonical.method.clone(),
            url: self.canonical.url.clone(),
            headers: self.canonical.headers.clone(),
            body: self.canonical.body.clone(),
        }
    }
}

/// One placeholder kind recognized in a template string.
#[derive(Debug, Clone, Copy)]
enum Placeholder {
    Int(i64, i64),
    Float(f64, f64),
    Str(usize, usize),
}

/// Resolves `{i:min:max}`, `{f:min:max}`, `{s:min:max}` placeholders in the
/// URL and body on every call. Bodies and URLs are rendered independently
/// per request, so placeholders never resolve to a stale value from a
/// previous request; a `rand::thread_rng()` draw backs each resolution,
/// satisfying the "thread-safe, per-worker random source" requirement of
/// §5 since each call only ever touches the calling thread's RNG.
pub struct TemplatedRequestFactory {
    method: Method,
    url_template: String,
    headers: HeaderMap,
    body_template: Option<String>,
}

impl TemplatedRequestFactory {
    pub fn new(
        method: Method,
        url_template: String,
        headers: HeaderMap,
        body_template: Option<String>,
    ) -> Self {
        Self {
            method,
            url_template,
            headers,
            body_template,
        }
    }

    fn render(template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let bytes = template.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' {
                if let Some(end) = template[i..].find('}') {
                    let token = &template[i + 1..i + end];
                    if let Some(ph) = parse_placeholder(token) {
                        out.push_str(&render_placeholder(ph));
                        i += end + 1;
                        continue;
                    }
                }
            }
            let ch = template[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
        out
    }
}

fn parse_placeholder(token: &str) -> Option<Placeholder> {
    let mut parts = token.splitn(2, ':');
    let kind = parts.next()?;
    let bounds = parts.next();

    match kind.chars().next()? {
        'i' => {
            let (min, max) = bounds.and_then(parse_int_bounds).unwrap_or((0, i64::MAX));
            Some(Placeholder::Int(min, max))
        }
        'f' => {
            let (min, max) = bounds.and_then(parse_float_bounds).unwrap_or((0.0, 1.0));
            Some(Placeholder::Float(min, max))
        }
        's' => {
            let (min, max) = bounds.and_then(parse_int_bounds).unwrap_or((1, 16));
            Some(Placeholder::Str(min as usize, max as usize))
        }
        _ => None,
    }
}

fn parse_int_bounds(s: &str) -> Option<(i64, i64)> {
    let mut parts = s.splitn(2, ':');
    let min = parts.next()?.parse().ok()?;
    let max = parts.next()?.parse().ok()?;
    Some((min, max))
}

fn parse_float_bounds(s: &str) -> Option<(f64, f64)> {
    let mut parts = s.splitn(2, ':');
    let min = parts.next()?.parse().ok()?;
    let max = parts.next()?.parse().ok()?;
    Some((min, max))
}

fn render_placeholder(ph: Placeholder) -> String {
    let mut rng = rand::thread_rng();
    match ph {
        Placeholder::Int(min, max) => rng.gen_range(min..=max).to_string(),
        Placeholder::Float(min, max) => format!("{:.6}", rng.gen_range(min..=max)),
        Placeholder::Str(min, max) => {
            let len = if max > min { rng.gen_range(min..=max) } else { min };
            const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
            (0..len)
                .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                .collect()
        }
    }
}

impl RequestFactory for TemplatedRequestFactory {
    fn next_request(&self) -> BuiltRequest {
        let url = Self::render(&self.url_template);
        let body = self.body_template.as_deref().map(Self::render);

        BuiltRequest {
            method: self.method.clone(),
            url: Url::parse(&url).unwrap_or_else(|_| {
                Url::parse(&self.url_template).expect("url template must be a valid base url")
            }),
            headers: self.headers.clone(),
            body: body.map(Bytes::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_default_is_appended_when_absent() {
        let canonical = Canonical::new(
            Method::GET,
            Url::parse("http://example.com").unwrap(),
            HeaderMap::new(),
            None,
        );
        assert_eq!(
            canonical.headers.get(reqwest::header::USER_AGENT).unwrap(),
            "hey/0.0.1"
        );
    }

    #[test]
    fn user_agent_is_not_overwritten_when_present() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::USER_AGENT, "custom/1.0".parse().unwrap());
        let canonical = Canonical::new(
            Method::GET,
            Url::parse("http://example.com").unwrap(),
            headers,
            None,
        );
        assert_eq!(
            canonical.headers.get(reqwest::header::USER_AGENT).unwrap(),
            "custom/1.0"
        );
    }

    #[test]
    fn static_factory_never_aliases_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Test", "a".parse().unwrap());
        let canonical = Canonical::new(
            Method::GET,
            Url::parse("http://example.com").unwrap(),
            headers,
            None,
        );
        let factory = StaticRequestFactory::new(canonical);

        let mut first = factory.next_request();
        first.headers.insert("X-Test", "mutated".parse().unwrap());

        let second = factory.next_request();
        assert_eq!(second.headers.get("X-Test").unwrap(), "a");
    }

    #[test]
    fn templated_int_placeholder_resolves_within_bounds() {
        let factory = TemplatedRequestFactory::new(
            Method::GET,
            "http://example.com/item/{i:1:10}".to_string(),
            HeaderMap::new(),
            None,
        );
        for _ in 0..50 {
            let req = factory.next_request();
            let path = req.url.path();
            let n: i64 = path.rsplit('/').next().unwrap().parse().unwrap();
            assert!((1..=10).contains(&n));
        }
    }

    #[test]
    fn templated_body_renders_independently_of_url() {
        let factory = TemplatedRequestFactory::new(
            Method::POST,
            "http://example.com/".to_string(),
            HeaderMap::new(),
            Some("payload-{s:4:4}".to_string()),
        );
        let req = factory.next_request();
        let body = req.body.unwrap();
        let body = std::str::from_utf8(&body).unwrap();
        assert_eq!(body.len(), "payload-".len() + 4);
    }
}
