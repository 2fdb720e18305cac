use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::StreamExt;
use futures_core::{ready, Stream};
use hyper::Body;
use pin_project_lite::pin_project;
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;
use tracing::trace;

/// The digest algorithms used for artifact side-car files, in the order they
/// are preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Sha256,
    Md5,
}

impl DigestKind {
    pub const PREFERENCE_ORDER: [DigestKind; 2] = [DigestKind::Sha256, DigestKind::Md5];

    pub fn side_car_suffix(&self) -> &'static str {
        match self {
            DigestKind::Sha256 => ".sha256",
            DigestKind::Md5 => ".md5",
        }
    }
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestKind::Sha256 => f.write_str("SHA-256"),
            DigestKind::Md5 => f.write_str("MD5"),
        }
    }
}

#[derive(Clone)]
pub enum Hasher {
    Sha256(Sha256),
    Md5(md5::Context),
}

impl Hasher {
    pub fn new(kind: DigestKind) -> Hasher {
        match kind {
            DigestKind::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestKind::Md5 => Hasher::Md5(md5::Context::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(hasher) => hasher.update(data),
            Hasher::Md5(context) => context.consume(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Sha256(hasher) => hasher.finalize().to_vec(),
            Hasher::Md5(context) => context.compute().to_vec(),
        }
    }
}

/// Extracts the digest from a side-car file body: a hex string, possibly
/// followed by the file name it was computed for.
pub fn parse_side_car(text: &str) -> Option<Vec<u8>> {
    let token = text.split_whitespace().next()?;
    hex::decode(token).ok()
}

/// Digest of a file's bytes on disk, streamed rather than materialized.
pub async fn hash_file(path: &Path, kind: DigestKind) -> io::Result<Vec<u8>> {
    let file = tokio::fs::OpenOptions::new().read(true).open(path).await?;
    let mut stream = ReaderStream::new(file);
    let mut hasher = Hasher::new(kind);
    while let Some(chunk) = stream.next().await {
        hasher.update(&chunk?);
    }
    Ok(hasher.finalize())
}

pin_project! {
    /// Wraps an HTTP body so it can be consumed without materializing it while
    /// still being validated against an expected digest, which requires seeing
    /// the entire body.
    ///
    /// On mismatch the stream appends an error item after the last data chunk;
    /// once an error was returned the stream stops polling upstream and keeps
    /// returning errors.
    pub struct ChecksumStream {
        #[pin]
        body: Body,
        validation: Option<(Hasher, DigestKind, Vec<u8>)>,
        is_failed: bool,
    }
}

impl ChecksumStream {
    pub fn new(body: Body, expected: Option<(DigestKind, Vec<u8>)>) -> ChecksumStream {
        ChecksumStream {
            body,
            validation: expected.map(|(kind, digest)| (Hasher::new(kind), kind, digest)),
            is_failed: false,
        }
    }
}

impl Stream for ChecksumStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_failed {
            return Poll::Ready(Some(Err(io::Error::other("polling from failed stream"))));
        }

        let this = self.project();
        match ready!(this.body.poll_next(cx)) {
            Some(Ok(data)) => {
                if let Some((hasher, _, _)) = this.validation {
                    hasher.update(&data);
                }
                Poll::Ready(Some(Ok(data)))
            }
            None => match this.validation {
                None => Poll::Ready(None),
                Some((hasher, kind, expected)) => {
                    trace!("validating {} digest", kind);
                    if hasher.clone().finalize() == *expected {
                        Poll::Ready(None)
                    } else {
                        *this.is_failed = true;
                        Poll::Ready(Some(Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("{} digest mismatch", kind),
                        ))))
                    }
                }
            },
            Some(Err(e)) => {
                *this.is_failed = true;
                Poll::Ready(Some(Err(io::Error::other(e))))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.body.size_hint()
    }
}
