//! Source fetching: resolve one yearly sheet to raw CSV text, trying every
//! export-URL variant through every transport proxy until one answers with
//! something usable.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Source;
use crate::error::PipelineError;

/// Export-URL variants per sheet, tried in order. The gviz endpoint serves
/// some sheets the plain export endpoint 404s on.
static EXPORT_URL_TEMPLATES: &[&str] = &[
    "https://docs.google.com/spreadsheets/d/{id}/export?format=csv&gid={gid}",
    "https://docs.google.com/spreadsheets/d/{id}/gviz/tq?tqx=out:csv&gid={gid}",
];

/// Proxy templates, tried in order for each export URL. Direct first; the
/// proxies exist for deployments whose egress blocks docs.google.com.
static PROXY_TEMPLATES: &[&str] = &[
    "{url}",
    "https://api.allorigins.win/raw?url={url}",
    "https://corsproxy.io/?{url}",
];

/// Bodies at or below this length are error stubs, not sheet exports.
const MIN_BODY_LEN: usize = 50;

/// Per-attempt timeout; a stuck proxy must not stall the whole pass.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Black-box transport: one URL in, body text out. A trait seam so the
/// pipeline runs against canned bodies in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

/// Production transport over a shared reqwest client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?;
        resp.text()
            .await
            .with_context(|| format!("reading body from {url}"))
    }
}

/// Ordered candidate URLs for one source: every export variant through
/// every proxy, direct attempt first per variant.
pub fn candidate_urls(source: &Source) -> Vec<String> {
    let mut out = Vec::with_capacity(EXPORT_URL_TEMPLATES.len() * PROXY_TEMPLATES.len());
    for export in EXPORT_URL_TEMPLATES {
        let target = export
            .replace("{id}", &source.id)
            .replace("{gid}", &source.sheet_ref);
        for proxy in PROXY_TEMPLATES {
            if *proxy == "{url}" {
                out.push(target.clone());
            } else {
                out.push(proxy.replace("{url}", &urlencode(&target)));
            }
        }
    }
    out
}

/// `true` if the body is long enough to be a real export and is not an HTML
/// error page a proxy rewrote the status of.
pub fn is_usable_body(body: &str) -> bool {
    if body.len() <= MIN_BODY_LEN {
        return false;
    }
    let head = body.trim_start().to_lowercase();
    !(head.starts_with("<!doctype") || head.starts_with("<html"))
}

/// Resolve one source to CSV text, short-circuiting on the first usable
/// response across the URL x proxy matrix.
pub async fn fetch_source_csv<T: Transport + ?Sized>(
    transport: &T,
    source: &Source,
) -> Result<String, PipelineError> {
    for url in candidate_urls(source) {
        match transport.get(&url).await {
            Ok(body) if is_usable_body(&body) => {
                debug!(year = source.declared_year, %url, bytes = body.len(), "source fetched");
                return Ok(body);
            }
            Ok(body) => {
                debug!(
                    year = source.declared_year,
                    %url,
                    bytes = body.len(),
                    "unusable body, trying next candidate"
                );
            }
            Err(err) => {
                warn!(year = source.declared_year, %url, error = %err, "fetch attempt failed");
            }
        }
    }
    Err(PipelineError::SourceUnreachable {
        year: source.declared_year,
    })
}

/// Percent-encode a URL for embedding as a proxy query value.
fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct CannedTransport {
        bodies: HashMap<String, String>,
        hits: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn get(&self, url: &str) -> Result<String> {
            self.hits.lock().unwrap().push(url.to_string());
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("unreachable: {url}"))
        }
    }

    fn source() -> Source {
        Source {
            id: "SHEET".into(),
            sheet_ref: "0".into(),
            declared_year: 2025,
        }
    }

    #[test]
    fn candidates_are_variant_major_direct_first() {
        let urls = candidate_urls(&source());
        assert_eq!(urls.len(), 6);
        assert!(urls[0].starts_with("https://docs.google.com/spreadsheets/d/SHEET/export"));
        assert!(urls[1].starts_with("https://api.allorigins.win/raw?url="));
        assert!(urls[3].starts_with("https://docs.google.com/spreadsheets/d/SHEET/gviz"));
    }

    #[test]
    fn html_and_stub_bodies_are_rejected() {
        assert!(!is_usable_body("  <!DOCTYPE html><title>Error</title>"));
        assert!(!is_usable_body("<html><body>sorry</body></html>"));
        assert!(!is_usable_body("short"));
        let csv = "Date,Content\n".repeat(10);
        assert!(is_usable_body(&csv));
    }

    #[tokio::test]
    async fn fallback_stops_at_first_usable_response() {
        let src = source();
        let urls = candidate_urls(&src);
        let mut bodies = HashMap::new();
        // direct attempt serves an HTML error page, first proxy works
        bodies.insert(urls[0].clone(), "<html>blocked</html>".to_string());
        bodies.insert(urls[1].clone(), "Date,Content\n".repeat(10));
        let transport = CannedTransport {
            bodies,
            hits: Mutex::new(Vec::new()),
        };

        let body = fetch_source_csv(&transport, &src).await.unwrap();
        assert!(body.starts_with("Date,Content"));
        assert_eq!(transport.hits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_matrix_reports_source_unreachable() {
        let transport = CannedTransport {
            bodies: HashMap::new(),
            hits: Mutex::new(Vec::new()),
        };
        let err = fetch_source_csv(&transport, &source()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SourceUnreachable { year: 2025 }
        ));
        // all six candidates were attempted
        assert_eq!(transport.hits.lock().unwrap().len(), 6);
    }
}
