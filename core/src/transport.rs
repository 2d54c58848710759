//! The transport capability: send one `HttpRequest`, get one `HttpResponse`.
//!
//! # Design
//! `ApiClient` never performs I/O itself. Anything that implements
//! `Transport` can carry requests: the bundled `UreqTransport`, a platform
//! HTTP stack, or an in-memory test double. Transports report failures to
//! produce a response as `TransportError`; status interpretation is left to
//! the client, so a 4xx/5xx answer is an `Ok` response here.

use std::sync::Arc;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Minimal blocking HTTP transport.
///
/// Implementations must be safe to share between threads; the client holds
/// them behind an `Arc` and may be cloned freely.
///
/// ```ignore
/// use api_client::{HttpRequest, HttpResponse, Transport, TransportError};
///
/// struct Canned;
///
/// impl Transport for Canned {
///     fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
///         if let Some(err) = request.context.err() {
///             return Err(err.into());
///         }
///         Ok(HttpResponse::new(200, r#"{"success":true}"#))
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

#[cfg(feature = "ureq-transport")]
pub use self::ureq_impl::UreqTransport;

#[cfg(feature = "ureq-transport")]
mod ureq_impl {
    use std::time::Duration;

    use tracing::trace;
    use ureq::http;

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{Body, HttpRequest, HttpResponse};

    /// Blocking transport built on a `ureq::Agent`.
    ///
    /// Status codes are never turned into errors by the agent; the client
    /// decides what a 4xx/5xx means. The context is checked before any I/O,
    /// and each call is bounded by the earlier of the context deadline and
    /// the transport timeout. Response bodies are streamed, not buffered, so
    /// their size is not capped here.
    ///
    /// ```ignore
    /// use std::sync::Arc;
    /// use api_client::{ApiClient, UreqTransport};
    ///
    /// let client = ApiClient::new("https://api.example.com", Arc::new(UreqTransport::new()));
    /// ```
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
        timeout: Option<Duration>,
    }

    impl UreqTransport {
        /// Agent without a timeout; callers bound calls through the context.
        pub fn new() -> Self {
            Self::with_agent(
                ureq::Agent::config_builder()
                    .http_status_as_error(false)
                    .build()
                    .new_agent(),
            )
        }

        /// Upper bound for every call, tightened further by context deadlines.
        pub fn with_timeout(timeout: Duration) -> Self {
            Self {
                timeout: Some(timeout),
                ..Self::new()
            }
        }

        /// Use a preconfigured agent. It should have `http_status_as_error`
        /// disabled, otherwise error statuses surface as transport failures.
        pub fn with_agent(agent: ureq::Agent) -> Self {
            Self {
                agent,
                timeout: None,
            }
        }

        /// The per-call timeout: the earlier of the context's remaining time
        /// and the transport timeout.
        pub(crate) fn call_timeout(&self, remaining: Option<Duration>) -> Option<Duration> {
            match (remaining, self.timeout) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            }
        }

        fn run<B>(
            &self,
            request: http::Request<B>,
            timeout: Option<Duration>,
        ) -> Result<HttpResponse, TransportError>
        where
            B: ureq::AsSendBody,
        {
            let request = match timeout {
                Some(timeout) => self
                    .agent
                    .configure_request(request)
                    .timeout_global(Some(timeout))
                    .build(),
                None => request,
            };
            let response = self.agent.run(request).map_err(into_transport_error)?;

            let (parts, body) = response.into_parts();
            let status = parts.status.as_u16();
            let headers = parts
                .headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();

            trace!(status, ?timeout, "ureq response received");

            Ok(HttpResponse {
                status,
                headers,
                body: Body::from_reader(body.into_reader()),
            })
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            if let Some(err) = request.context.err() {
                return Err(err.into());
            }
            let timeout = self.call_timeout(request.context.remaining());

            let mut builder = http::Request::builder()
                .method(request.method.as_str())
                .uri(request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = match request.body {
                Some(body) => {
                    let bytes = body.read_to_vec()?;
                    self.run(builder.body(bytes).map_err(TransportError::other)?, timeout)
                }
                None => self.run(builder.body(()).map_err(TransportError::other)?, timeout),
            };

            // A call cut short by the context deadline reports the deadline,
            // not the agent's timeout error.
            match request.context.err() {
                Some(err) => Err(err.into()),
                None => response,
            }
        }
    }

    fn into_transport_error(err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Io(io) => TransportError::Io(io),
            other => TransportError::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::http::HttpMethod;

    struct Fixed(u16);

    impl Transport for Fixed {
        fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse::new(self.0, ""))
        }
    }

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/".parse().unwrap(),
            headers: Vec::new(),
            body: None,
            context: Context::background(),
        }
    }

    #[test]
    fn pointer_impls_delegate() {
        let fixed = Fixed(204);
        assert_eq!((&fixed).send(request()).unwrap().status, 204);
        assert_eq!(Box::new(Fixed(201)).send(request()).unwrap().status, 201);

        let shared: Arc<dyn Transport> = Arc::new(Fixed(202));
        assert_eq!(shared.send(request()).unwrap().status, 202);
    }

    #[cfg(feature = "ureq-transport")]
    #[test]
    fn call_timeout_takes_the_earlier_bound() {
        use std::time::Duration;

        let unbounded = UreqTransport::new();
        assert_eq!(unbounded.call_timeout(None), None);
        assert_eq!(
            unbounded.call_timeout(Some(Duration::from_millis(50))),
            Some(Duration::from_millis(50))
        );

        let bounded = UreqTransport::with_timeout(Duration::from_secs(1));
        assert_eq!(bounded.call_timeout(None), Some(Duration::from_secs(1)));
        assert_eq!(
            bounded.call_timeout(Some(Duration::from_millis(50))),
            Some(Duration::from_millis(50))
        );
        assert_eq!(
            bounded.call_timeout(Some(Duration::from_secs(60))),
            Some(Duration::from_secs(1))
        );
    }

    #[cfg(feature = "ureq-transport")]
    #[test]
    fn ureq_transport_refuses_cancelled_context() {
        let transport = UreqTransport::new();
        let mut req = request();
        req.url = "http://127.0.0.1:9/".parse().unwrap();
        req.context.cancel();
        assert!(matches!(transport.send(req), Err(TransportError::Cancelled)));
    }

    #[cfg(feature = "ureq-transport")]
    #[test]
    fn ureq_transport_refuses_expired_context() {
        let transport = UreqTransport::new();
        let mut req = request();
        req.url = "http://127.0.0.1:9/".parse().unwrap();
        req.context = Context::with_timeout(std::time::Duration::ZERO);
        assert!(matches!(
            transport.send(req),
            Err(TransportError::DeadlineExceeded)
        ));
    }
}
