//! Request and response instrumentation for HTTP services.
//!
//! [`HttpMetrics`] registers a fixed set of instruments in a [`Registry`] and updates them around each request
//! handled by a service:
//!
//! | Name | Kind | Updated with |
//! |---|---|---|
//! | `requests` | meter | every request |
//! | `requests.gets`, `requests.puts`, `requests.posts`, `requests.heads`, `requests.deletes`, `requests.options` | meter | requests with that method |
//! | `requests.active` | counter | requests currently being handled |
//! | `requests.size` | histogram | the `Content-Length` of requests that declare one |
//! | `requests.handling-time` | timer | time spent in the handler |
//! | `responses.1XX` through `responses.5XX` | meter | responses, by status class |
//!
//! A handler that fails, or panics, counts as a `5XX` response.  Its error is returned unchanged.
//!
//! ```rust
//! # use hyper::{Request, Response, StatusCode};
//! # use metrology::Registry;
//! # use metrology_http::HttpMetrics;
//! let registry = Registry::new();
//! let metrics = HttpMetrics::new(&registry)?;
//!
//! let request = Request::get("/health").body(()).unwrap();
//! let response = metrics.handle(request, |_req| {
//!     Ok::<_, std::convert::Infallible>(Response::new("OK"))
//! });
//!
//! assert_eq!(response.unwrap().status(), StatusCode::OK);
//! assert_eq!(registry.meter("responses.2XX")?.count(), 1);
//! # Ok::<(), metrology::Error>(())
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

use std::{fmt, future::Future, pin::Pin, thread};

use hyper::{header::CONTENT_LENGTH, service::Service, HeaderMap, Method, Request, Response};
use metrology::{Counter, Histogram, Meter, Registry, Timer, TimingHandle};
use tracing::trace;

/// Instruments for the requests handled by a service.
///
/// Cloning is cheap, and clones update the same instruments.
#[derive(Clone)]
pub struct HttpMetrics {
    requests: Meter,
    gets: Meter,
    puts: Meter,
    posts: Meter,
    heads: Meter,
    deletes: Meter,
    options: Meter,
    active: Counter,
    size: Histogram,
    handling_time: Timer,
    responses: [Meter; 5],
}

impl HttpMetrics {
    /// Registers the instruments in `registry`, or looks up the existing ones.
    ///
    /// # Errors
    ///
    /// Fails if one of the names is already registered as a different kind of metric.
    pub fn new(registry: &Registry) -> Result<Self, metrology::Error> {
        Ok(Self {
            requests: registry.meter("requests")?,
            gets: registry.meter("requests.gets")?,
            puts: registry.meter("requests.puts")?,
            posts: registry.meter("requests.posts")?,
            heads: registry.meter("requests.heads")?,
            deletes: registry.meter("requests.deletes")?,
            options: registry.meter("requests.options")?,
            active: registry.counter("requests.active")?,
            size: registry.histogram("requests.size")?,
            handling_time: registry.timer("requests.handling-time")?,
            responses: [
                registry.meter("responses.1XX")?,
                registry.meter("responses.2XX")?,
                registry.meter("responses.3XX")?,
                registry.meter("responses.4XX")?,
                registry.meter("responses.5XX")?,
            ],
        })
    }

    fn method_meter(&self, method: &Method) -> Option<&Meter> {
        match *method {
            Method::GET => Some(&self.gets),
            Method::PUT => Some(&self.puts),
            Method::POST => Some(&self.posts),
            Method::HEAD => Some(&self.heads),
            Method::DELETE => Some(&self.deletes),
            Method::OPTIONS => Some(&self.options),
            _ => None,
        }
    }

    /// Records an incoming request: its method and, when declared, its size.
    pub fn record_request<B>(&self, request: &Request<B>) {
        self.requests.mark();
        if let Some(meter) = self.method_meter(request.method()) {
            meter.mark();
        }
        if let Some(length) = content_length(request.headers()) {
            self.size.update(length);
        }
    }

    /// Records an outgoing response by its status class.
    pub fn record_response<B>(&self, response: &Response<B>) {
        self.record_status(response.status().as_u16());
    }

    /// Records a response status code by its class.
    ///
    /// Codes outside of `100..=599` are ignored.
    pub fn record_status(&self, status: u16) {
        match status {
            100..=599 => self.responses[usize::from(status / 100) - 1].mark(),
            _ => trace!(status, "ignoring status code outside of the known classes"),
        }
    }

    fn begin<B>(&self, request: &Request<B>) -> InFlight {
        self.record_request(request);
        self.active.increment();
        InFlight { metrics: self.clone(), timing: Some(self.handling_time.start()), finished: false }
    }

    /// Handles `request` with `handler`, recording the request and its outcome.
    ///
    /// Successful responses are recorded by their status, and errors as a `5XX` response.  The handler's result is
    /// returned unchanged.
    pub fn handle<B, R, E, F>(&self, request: Request<B>, handler: F) -> Result<Response<R>, E>
    where
        F: FnOnce(Request<B>) -> Result<Response<R>, E>,
    {
        let in_flight = self.begin(&request);
        let result = handler(request);
        in_flight.finish(&result);
        result
    }

    /// Handles `request` with the asynchronous `handler`, recording the request and its outcome.
    ///
    /// The request is recorded immediately, and the outcome once the returned future resolves.  If the future is
    /// dropped before it resolves, the request stops counting as active but no response is recorded.
    pub fn handle_async<B, R, E, F, Fut>(
        &self,
        request: Request<B>,
        handler: F,
    ) -> impl Future<Output = Result<Response<R>, E>>
    where
        F: FnOnce(Request<B>) -> Fut,
        Fut: Future<Output = Result<Response<R>, E>>,
    {
        let in_flight = self.begin(&request);
        track(in_flight, handler(request))
    }

    /// Wraps a `hyper` service so that every request it handles is recorded.
    pub fn instrument<S>(&self, service: S) -> Instrumented<S> {
        Instrumented { metrics: self.clone(), inner: service }
    }
}

impl fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMetrics")
            .field("requests", &self.requests.count())
            .field("active", &self.active.count())
            .finish_non_exhaustive()
    }
}

fn track<R, E, Fut>(in_flight: InFlight, future: Fut) -> impl Future<Output = Result<Response<R>, E>>
where
    Fut: Future<Output = Result<Response<R>, E>>,
{
    async move {
        let result = future.await;
        in_flight.finish(&result);
        result
    }
}

fn content_length(headers: &HeaderMap) -> Option<i64> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.trim().parse::<i64>().ok().filter(|n| *n >= 0)
}

/// A request being handled.
///
/// Dropping it stops the request counting as active and records its handling time.
struct InFlight {
    metrics: HttpMetrics,
    timing: Option<TimingHandle>,
    finished: bool,
}

impl InFlight {
    fn finish<R, E>(mut self, result: &Result<Response<R>, E>) {
        if let Some(timing) = self.timing.take() {
            timing.stop();
        }
        match result {
            Ok(response) => self.metrics.record_response(response),
            Err(_) => self.metrics.record_status(500),
        }
        self.finished = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.metrics.active.decrement();
        if !self.finished && thread::panicking() {
            self.metrics.record_status(500);
        }
    }
}

/// A `hyper` service that records every request it handles.
///
/// Created by [`HttpMetrics::instrument`].
#[derive(Clone, Debug)]
pub struct Instrumented<S> {
    metrics: HttpMetrics,
    inner: S,
}

impl<S> Instrumented<S> {
    /// The wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, B, R> Service<Request<B>> for Instrumented<S>
where
    S: Service<Request<B>, Response = Response<R>>,
    S::Future: Send + 'static,
    S::Error: 'static,
    R: 'static,
{
    type Response = Response<R>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<R>, S::Error>> + Send>>;

    fn call(&self, request: Request<B>) -> Self::Future {
        let in_flight = self.metrics.begin(&request);
        Box::pin(track(in_flight, self.inner.call(request)))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        io,
        panic::{catch_unwind, AssertUnwindSafe},
        time::Duration,
    };

    use hyper::{header::CONTENT_LENGTH, service::service_fn, Method, Request, Response, StatusCode};
    use metrology::{Registry, SingleValued, TimeUnit, Value};
    use quanta::Clock;

    use super::HttpMetrics;

    fn request(method: Method) -> Request<()> {
        Request::builder().method(method).uri("/").body(()).unwrap()
    }

    fn response(status: u16) -> Response<()> {
        Response::builder().status(status).body(()).unwrap()
    }

    #[test]
    fn test_method_meters() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        for method in [Method::GET, Method::GET, Method::PUT, Method::POST, Method::HEAD] {
            metrics.record_request(&request(method));
        }
        metrics.record_request(&request(Method::DELETE));
        metrics.record_request(&request(Method::OPTIONS));
        metrics.record_request(&request(Method::PATCH));

        let count = |name: &str| registry.meter(name).unwrap().count();
        assert_eq!(count("requests.gets"), 2);
        assert_eq!(count("requests.puts"), 1);
        assert_eq!(count("requests.posts"), 1);
        assert_eq!(count("requests.heads"), 1);
        assert_eq!(count("requests.deletes"), 1);
        assert_eq!(count("requests.options"), 1);
        assert_eq!(count("requests"), 8);
    }

    #[test]
    fn test_request_size() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        for length in ["512", " 1024 ", "-1", "lots"] {
            let request = Request::post("/upload").header(CONTENT_LENGTH, length).body(()).unwrap();
            metrics.record_request(&request);
        }
        metrics.record_request(&request(Method::POST));

        let size = registry.histogram("requests.size").unwrap();
        assert_eq!(size.count(), 2);
        assert_eq!(size.sample().values(), [512, 1024]);
    }

    #[test]
    fn test_status_classes() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        for status in [100, 200, 204, 301, 404, 418, 503] {
            metrics.record_response(&response(status));
        }
        metrics.record_status(599);

        let counts: Vec<u64> = ["1XX", "2XX", "3XX", "4XX", "5XX"]
            .iter()
            .map(|class| registry.meter(&format!("responses.{}", class)).unwrap().count())
            .collect();
        assert_eq!(counts, [1, 2, 1, 2, 2]);
    }

    #[test]
    fn test_out_of_range_status_marks_nothing() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        metrics.record_response(&response(600));
        metrics.record_status(99);
        metrics.record_status(0);

        for class in ["1XX", "2XX", "3XX", "4XX", "5XX"] {
            let meter = registry.meter(&format!("responses.{}", class)).unwrap();
            assert_eq!(meter.value(), Value::Integer(0));
        }
    }

    #[test]
    fn test_handle_records_outcome() {
        let (clock, mock) = Clock::mock();
        let registry = Registry::with_clock(clock);
        let metrics = HttpMetrics::new(&registry).unwrap();

        let result = metrics.handle(request(Method::GET), |_| {
            assert_eq!(registry.counter("requests.active").unwrap().count(), 1);
            mock.increment(Duration::from_millis(40));
            Ok::<_, Infallible>(response(201))
        });

        assert_eq!(result.unwrap().status(), StatusCode::CREATED);
        assert_eq!(registry.counter("requests.active").unwrap().count(), 0);
        assert_eq!(registry.meter("responses.2XX").unwrap().count(), 1);

        let timer = registry.timer("requests.handling-time").unwrap();
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.snapshot(TimeUnit::Milliseconds).max, 40.0);
    }

    #[test]
    fn test_handle_passes_errors_through() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        let err = metrics
            .handle(request(Method::POST), |_| {
                Err::<Response<()>, _>(io::Error::new(io::ErrorKind::Other, "backend down"))
            })
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(err.to_string(), "backend down");
        assert_eq!(registry.meter("responses.5XX").unwrap().count(), 1);
        assert_eq!(registry.counter("requests.active").unwrap().count(), 0);
        assert_eq!(registry.timer("requests.handling-time").unwrap().count(), 1);
    }

    #[test]
    fn test_handle_panic_counts_as_server_error() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| {
            metrics.handle(request(Method::GET), |_| -> Result<Response<()>, Infallible> {
                panic!("handler bug")
            })
        }));

        assert!(result.is_err());
        assert_eq!(registry.meter("responses.5XX").unwrap().count(), 1);
        assert_eq!(registry.counter("requests.active").unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_handle_async() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        let future = metrics
            .handle_async(request(Method::DELETE), |_| async { Ok::<_, Infallible>(response(404)) });
        assert_eq!(registry.counter("requests.active").unwrap().count(), 1);
        assert_eq!(registry.meter("requests.deletes").unwrap().count(), 1);

        assert_eq!(future.await.unwrap().status(), StatusCode::NOT_FOUND);
        assert_eq!(registry.counter("requests.active").unwrap().count(), 0);
        assert_eq!(registry.meter("responses.4XX").unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_future_records_no_response() {
        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();

        let future = metrics.handle_async(request(Method::GET), |_| {
            std::future::pending::<Result<Response<()>, Infallible>>()
        });
        assert_eq!(registry.counter("requests.active").unwrap().count(), 1);
        drop(future);

        assert_eq!(registry.counter("requests.active").unwrap().count(), 0);
        assert_eq!(registry.timer("requests.handling-time").unwrap().count(), 1);
        for class in ["1XX", "2XX", "3XX", "4XX", "5XX"] {
            assert_eq!(registry.meter(&format!("responses.{}", class)).unwrap().count(), 0);
        }
    }

    #[tokio::test]
    async fn test_instrumented_service() {
        use hyper::service::Service as _;

        let registry = Registry::new();
        let metrics = HttpMetrics::new(&registry).unwrap();
        let service = metrics.instrument(service_fn(|req: Request<String>| async move {
            let status = if req.uri().path() == "/missing" { 404 } else { 200 };
            Ok::<_, Infallible>(Response::builder().status(status).body(String::new()).unwrap())
        }));

        service.call(Request::get("/").body(String::new()).unwrap()).await.unwrap();
        service.call(Request::get("/missing").body(String::new()).unwrap()).await.unwrap();

        assert_eq!(registry.meter("requests.gets").unwrap().count(), 2);
        assert_eq!(registry.meter("responses.2XX").unwrap().count(), 1);
        assert_eq!(registry.meter("responses.4XX").unwrap().count(), 1);
        assert_eq!(registry.timer("requests.handling-time").unwrap().count(), 2);
    }
}
