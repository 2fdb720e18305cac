use base64::Engine;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::{AUTHORIZATION, CACHE_CONTROL, USER_AGENT};
use hyper::{Body, Client, Request, Response, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use tracing::trace;

use crate::error::ResolveError;
use crate::util::checksum::{ChecksumStream, DigestKind};

/// HTTP retrieval for remote repositories. A 404 maps to
/// [`ResolveError::NotFound`] so callers can fall through to the next
/// repository; every other failure is a fatal retrieval error.
///
/// Responses are requested uncached so every call reflects current repository
/// state. Instances cache HTTP connections internally, so keeping one alive
/// across requests has performance benefits.
#[derive(Clone)]
pub struct HttpDownloader {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl Default for HttpDownloader {
    fn default() -> HttpDownloader {
        HttpDownloader::new()
    }
}

impl HttpDownloader {
    pub fn new() -> HttpDownloader {
        HttpDownloader {
            client: Client::builder().build::<_, Body>(HttpsConnector::new()),
        }
    }

    fn request(
        &self,
        url: &str,
        credentials: Option<(&str, &str)>,
    ) -> Result<Request<Body>, ResolveError> {
        let uri =
            Uri::try_from(url).map_err(|e| ResolveError::retrieval(url, e))?;

        let mut builder = Request::builder()
            .method("GET")
            .uri(uri)
            // Maven Central returns a 403 without a user agent
            .header(USER_AGENT, "curl/7.68.0")
            .header(CACHE_CONTROL, "no-cache");

        if let Some((username, password)) = credentials {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            builder = builder.header(AUTHORIZATION, format!("Basic {}", token));
        }

        builder
            .body(Body::empty())
            .map_err(|e| ResolveError::retrieval(url, e))
    }

    async fn get(
        &self,
        url: &str,
        credentials: Option<(&str, &str)>,
    ) -> Result<Response<Body>, ResolveError> {
        let request = self.request(url, credentials)?;
        trace!("getting {}", url);

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ResolveError::retrieval(url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ResolveError::not_found(url));
        }
        if !response.status().is_success() {
            return Err(ResolveError::retrieval(
                url,
                format!("upstream request failed: {}", response.status()),
            ));
        }
        Ok(response)
    }

    pub async fn get_text(
        &self,
        url: &str,
        credentials: Option<(&str, &str)>,
    ) -> Result<String, ResolveError> {
        let response = self.get(url, credentials).await?;
        let bytes = to_bytes(response.into_body())
            .await
            .map_err(|e| ResolveError::retrieval(url, e))?;
        String::from_utf8(bytes.into()).map_err(|e| ResolveError::retrieval(url, e))
    }

    /// Streams a response body, validating it against the expected digest (if
    /// any) as it is consumed.
    pub async fn get_stream(
        &self,
        url: &str,
        credentials: Option<(&str, &str)>,
        expected: Option<(DigestKind, Vec<u8>)>,
    ) -> Result<ChecksumStream, ResolveError> {
        let response = self.get(url, credentials).await?;
        Ok(ChecksumStream::new(response.into_body(), expected))
    }
}
