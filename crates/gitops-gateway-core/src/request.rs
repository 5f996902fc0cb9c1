//! A webhook delivery whose body has been read from the network exactly once.

use bytes::{buf::Reader, Buf, Bytes};
use http::{HeaderMap, Method, Request, Uri, Version};

use crate::context::{Context, ContextFields};

/// Errors raised while draining an inbound request body.
#[derive(Debug, thiserror::Error)]
pub enum RequestBodyError {
    #[error("Unable to read request body: {message}")]
    Read { message: String },

    #[error("Request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// One inbound HTTP request with its body buffered in memory.
///
/// The body is immutable after construction, so any number of consumers may
/// read it through [`BufferedRequest::body_reader`] without affecting each
/// other. [`Clone`] yields an independent request with the same method, URI,
/// headers and body; extensions are not carried.
#[derive(Debug)]
pub struct BufferedRequest {
    inner: Request<Bytes>,
}

impl BufferedRequest {
    /// Wrap a request whose body has already been drained.
    pub fn new(request: Request<Bytes>) -> Self {
        Self { inner: request }
    }

    /// Buffer a request whose body is still a stream.
    ///
    /// `read_body` drains the stream; it is the only time the body is read
    /// from the network.
    ///
    /// # Errors
    ///
    /// Propagates the [`RequestBodyError`] returned by `read_body`.
    pub async fn from_streaming<B, F, Fut>(
        request: Request<B>,
        read_body: F,
    ) -> Result<Self, RequestBodyError>
    where
        F: FnOnce(B) -> Fut,
        Fut: std::future::Future<Output = Result<Bytes, RequestBodyError>>,
    {
        let (parts, body) = request.into_parts();
        let bytes = read_body(body).await?;
        Ok(Self::new(Request::from_parts(parts, bytes)))
    }

    /// First value of the header, or an empty string if absent or not UTF-8.
    pub fn header(&self, key: &str) -> &str {
        self.inner
            .headers()
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// The buffered body bytes. Cloning the returned value is cheap.
    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// A fresh reader positioned at the start of the body.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::io::Read;
    /// use bytes::Bytes;
    /// use gitops_gateway_core::BufferedRequest;
    ///
    /// let request = BufferedRequest::new(http::Request::new(Bytes::from_static(b"payload")));
    ///
    /// for _ in 0..2 {
    ///     let mut body = String::new();
    ///     request.body_reader().read_to_string(&mut body).unwrap();
    ///     assert_eq!(body, "payload");
    /// }
    /// ```
    pub fn body_reader(&self) -> Reader<Bytes> {
        self.inner.body().clone().reader()
    }

    /// The underlying request.
    pub fn request(&self) -> &Request<Bytes> {
        &self.inner
    }

    /// Give up the wrapper and take the underlying request.
    pub fn into_request(self) -> Request<Bytes> {
        self.inner
    }

    /// An independent copy tagged with the fields of `ctx`.
    ///
    /// The copy carries the correlation fields as a request extension so a
    /// consumer that forwards the request elsewhere can stamp them on the wire.
    pub fn with_context(&self, ctx: &Context) -> Self {
        let mut copy = self.clone();
        copy.inner
            .extensions_mut()
            .insert::<ContextFields>(ctx.fields().carry_over());
        copy
    }

    /// Correlation fields attached by [`BufferedRequest::with_context`], if any.
    pub fn context_fields(&self) -> Option<&ContextFields> {
        self.inner.extensions().get::<ContextFields>()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }
}

impl Clone for BufferedRequest {
    fn clone(&self) -> Self {
        let mut request = Request::new(self.inner.body().clone());
        *request.method_mut() = self.inner.method().clone();
        *request.uri_mut() = self.inner.uri().clone();
        *request.version_mut() = self.inner.version();
        *request.headers_mut() = self.inner.headers().clone();
        Self { inner: request }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
