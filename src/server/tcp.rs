//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread por conexión. Cada conexión lee un request completo
//! (head + `Content-Length` bytes de body), lo enruta y cierra.

use crate::config::Config;
use crate::http::request::find_head_end;
use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::handlers as job_handlers;
use crate::jobs::pool::panic_message;
use crate::jobs::store::InMemoryJobStore;
use crate::jobs::JobManager;
use crate::media::catalog::{CatalogSource, YtDlpCatalog};
use crate::media::handlers::channel_handler;
use crate::media::ytdlp::YtDlpFetcher;
use crate::metrics::MetricsCollector;
use crate::router::Router;
use crate::ui;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Tamaño máximo del head del request
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Tamaño máximo del body (listas de URLs grandes caben de sobra)
const MAX_BODY_BYTES: usize = 1024 * 1024;

const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Servidor HTTP/1.0 concurrente con métricas
pub struct Server {
    config: Config,
    router: Arc<Router>,
    metrics: Arc<MetricsCollector>,
}

impl Server {
    /// Servidor con los colaboradores reales (yt-dlp)
    pub fn new(config: Config) -> Self {
        let tool = config.yt_dlp_tool();
        let fetcher = YtDlpFetcher::new(tool.clone(), config.output_dir.clone());
        let job_manager = JobManager::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(fetcher),
            config.worker_limits(),
        );
        Self::with_components(config, job_manager, Arc::new(YtDlpCatalog::new(tool)))
    }

    /// Servidor con un Job Manager y un catálogo ya construidos
    pub fn with_components(config: Config, job_manager: JobManager, catalog: Arc<dyn CatalogSource>) -> Self {
        let metrics = Arc::clone(job_manager.metrics());
        let router = build_router(Arc::new(job_manager), catalog, Arc::clone(&metrics));

        Self {
            config,
            router: Arc::new(router),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Abre el socket en la dirección configurada
    pub fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind(self.config.address())
    }

    /// Bind + serve (bloquea el thread)
    pub fn run(&self) -> io::Result<()> {
        let listener = self.bind()?;
        self.serve(listener)
    }

    /// Acepta conexiones y lanza un thread por cada una
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        let address = listener.local_addr()?;
        tracing::info!(%address, "server listening");

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let router = Arc::clone(&self.router);
            let metrics = Arc::clone(&self.metrics);
            let peer = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "unknown".to_string());

            let guard = ActiveConnection::new(Arc::clone(&self.metrics));
            let spawned = thread::Builder::new()
                .name("http-conn".to_string())
                .spawn(move || {
                    let _guard = guard;
                    if let Err(e) = handle_connection(stream, &router, &metrics) {
                        tracing::debug!(peer = %peer, error = %e, "connection error");
                    }
                });

            if let Err(e) = spawned {
                tracing::error!(error = %e, "could not spawn connection thread");
            }
        }

        Ok(())
    }
}

/// Cuenta una conexión activa mientras vive; el `Drop` la descuenta
/// aunque el thread termine por un panic.
struct ActiveConnection {
    metrics: Arc<MetricsCollector>,
}

impl ActiveConnection {
    fn new(metrics: Arc<MetricsCollector>) -> Self {
        metrics.increment_active_threads();
        Self { metrics }
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.metrics.decrement_active_threads();
    }
}

/// Rutas de la API
fn build_router(
    job_manager: Arc<JobManager>,
    catalog: Arc<dyn CatalogSource>,
    metrics: Arc<MetricsCollector>,
) -> Router {
    let mut router = Router::new();

    let page = ui::render_index(job_manager.limits());
    router.register(Method::GET, "/", move |_, _| Response::html(&page));

    let manager = Arc::clone(&job_manager);
    router.register(Method::POST, "/api/download", move |req, _| {
        job_handlers::download_handler(req, &manager)
    });

    let manager = Arc::clone(&job_manager);
    router.register(Method::GET, "/api/jobs/:id", move |_, params| {
        job_handlers::job_status_handler(&params["id"], &manager)
    });

    let manager = job_manager;
    router.register(Method::DELETE, "/api/jobs/:id", move |_, params| {
        job_handlers::job_delete_handler(&params["id"], &manager)
    });

    router.register(Method::GET, "/api/channel", move |req, _| {
        channel_handler(req, catalog.as_ref())
    });

    router.register(Method::GET, "/metrics", move |_, _| Response::json(&metrics.to_json()));

    router
}

/// Error al leer un request del socket
enum ReadError {
    Io(io::Error),
    TooLarge,
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

/// Lee hasta el fin del head y luego `Content-Length` bytes de body.
/// Retorna un buffer vacío si el peer cerró sin enviar nada.
fn read_request(stream: &mut TcpStream) -> Result<Vec<u8>, ReadError> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEAD_BYTES {
            return Err(ReadError::TooLarge);
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            // Peer cerró: lo que haya llegado se parsea tal cual
            return Ok(buffer);
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let content_length = content_length(&buffer[..head_end]);
    if content_length > MAX_BODY_BYTES {
        return Err(ReadError::TooLarge);
    }

    let wanted = head_end + 4 + content_length;
    while buffer.len() < wanted {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    Ok(buffer)
}

/// Valor de `Content-Length` en el head (0 si falta o es inválido)
fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Enruta el request; un handler que hace panic se responde con 500
fn route_guarded(router: &Router, request: &Request, request_id: &str) -> Response {
    match panic::catch_unwind(AssertUnwindSafe(|| router.route(request))) {
        Ok(response) => response,
        Err(payload) => {
            tracing::error!(
                request_id = %request_id,
                path = request.path(),
                panic = %panic_message(payload.as_ref()),
                "handler panicked"
            );
            Response::error(StatusCode::InternalServerError, "Internal server error")
        }
    }
}

/// Atiende una conexión: lee, enruta, responde y registra métricas
fn handle_connection(mut stream: TcpStream, router: &Router, metrics: &MetricsCollector) -> io::Result<()> {
    let start = Instant::now();
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let request_id = Uuid::new_v4().simple().to_string();

    let (mut response, label) = match read_request(&mut stream) {
        Ok(buffer) if buffer.is_empty() => {
            tracing::trace!("connection closed without data");
            return Ok(());
        }
        Ok(buffer) => match Request::parse(&buffer) {
            Ok(request) => {
                let label = router
                    .route_label(request.path())
                    .unwrap_or("<unmatched>")
                    .to_string();
                let mut response = route_guarded(router, &request, &request_id);
                if request.method() == Method::HEAD {
                    let len = response.body().len().to_string();
                    response = response.with_body(Vec::<u8>::new()).with_header("Content-Length", &len);
                }
                tracing::debug!(
                    request_id = %request_id,
                    method = request.method().as_str(),
                    path = request.path(),
                    "request"
                );
                (response, label)
            }
            Err(e) => {
                tracing::debug!(request_id = %request_id, error = %e, "invalid request");
                (
                    Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e)),
                    "<invalid>".to_string(),
                )
            }
        },
        Err(ReadError::TooLarge) => (
            Response::error(StatusCode::PayloadTooLarge, "Request too large"),
            "<invalid>".to_string(),
        ),
        Err(ReadError::Io(e)) => return Err(e),
    };

    response.add_header("X-Request-Id", &request_id);
    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    let latency = start.elapsed();
    metrics.record_request(&label, response.status().as_u16(), latency);
    tracing::info!(
        request_id = %request_id,
        route = %label,
        status = response.status().as_u16(),
        latency_ms = latency.as_secs_f64() * 1000.0,
        "request served"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::jobs::pool::WorkerLimits;
    use crate::jobs::types::{MediaMode, Outcome};
    use crate::media::catalog::CatalogEntry;
    use std::net::Shutdown;

    struct EmptyCatalog;

    impl CatalogSource for EmptyCatalog {
        fn list_entries(&self, _: &str, _: usize, _: usize) -> Result<Vec<CatalogEntry>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn test_router() -> (Router, Arc<MetricsCollector>) {
        let fetch = |_: &str, _: MediaMode, _: &str| Outcome::Done;
        let manager = JobManager::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(fetch),
            WorkerLimits::default(),
        );
        let metrics = Arc::clone(manager.metrics());
        let router = build_router(Arc::new(manager), Arc::new(EmptyCatalog), Arc::clone(&metrics));
        (router, metrics)
    }

    /// Envía `raw` por una conexión real y retorna la respuesta como texto
    fn roundtrip(raw: &[u8]) -> (String, Arc<MetricsCollector>) {
        let (router, metrics) = test_router();
        roundtrip_with(router, metrics, raw)
    }

    fn roundtrip_with(router: Router, metrics: Arc<MetricsCollector>, raw: &[u8]) -> (String, Arc<MetricsCollector>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_metrics = Arc::clone(&metrics);
        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &router, &server_metrics).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(raw).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        t.join().unwrap();

        (String::from_utf8_lossy(&buf).to_string(), metrics)
    }

    // ==================== Connections ====================

    #[test]
    fn test_handle_connection_index() {
        let (text, _) = roundtrip(b"GET / HTTP/1.0\r\n\r\n");
        assert!(text.starts_with("HTTP/1.0 200 OK"));
        assert!(text.contains("X-Request-Id:"));
        assert!(text.contains("<html"));
    }

    #[test]
    fn test_handle_connection_download_body() {
        let body = r#"{"urls": ["https://a"], "mode": "audio"}"#;
        let raw = format!(
            "POST /api/download HTTP/1.0\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let (text, metrics) = roundtrip(raw.as_bytes());

        assert!(text.contains("200 OK"));
        assert!(text.contains("\"job_id\""));
        assert_eq!(metrics.job_stats().jobs_created, 1);
    }

    #[test]
    fn test_handle_connection_metrics() {
        let (text, metrics) = roundtrip(b"GET /metrics HTTP/1.0\r\n\r\n");
        assert!(text.contains("200 OK"));
        assert!(text.contains("\"jobs\""));
        assert_eq!(metrics.get_snapshot().total_requests, 1);
    }

    #[test]
    fn test_handle_connection_unknown_job() {
        let (text, _) = roundtrip(b"GET /api/jobs/nope HTTP/1.0\r\n\r\n");
        assert!(text.contains("404 Not Found"));
        assert!(text.contains("Job not found"));
    }

    #[test]
    fn test_handle_connection_head() {
        let (text, _) = roundtrip(b"HEAD / HTTP/1.0\r\n\r\n");
        assert!(text.contains("200 OK"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_handle_connection_parse_error() {
        let (text, metrics) = roundtrip(b"\x00\x01\x02\x03garbage");
        assert!(text.contains("400 Bad Request"));
        assert!(text.contains("Invalid request"));
        assert_eq!(metrics.get_snapshot().total_requests, 1);
    }

    #[test]
    fn test_handle_connection_body_too_large() {
        let raw = format!(
            "POST /api/download HTTP/1.0\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_BYTES + 1
        );
        let (text, _) = roundtrip(raw.as_bytes());
        assert!(text.contains("413 Payload Too Large"));
    }

    // ==================== Panics ====================

    #[test]
    fn test_handler_panic_becomes_500() {
        let mut router = Router::new();
        router.register(Method::GET, "/boom", |_, _| panic!("handler exploded"));
        let metrics = Arc::new(MetricsCollector::new());

        let (text, metrics) = roundtrip_with(router, metrics, b"GET /boom HTTP/1.0\r\n\r\n");
        assert!(text.starts_with("HTTP/1.0 500 Internal Server Error"), "got: {}", text);
        assert!(text.contains("X-Request-Id:"));
        assert_eq!(metrics.get_snapshot().total_requests, 1);
    }

    #[test]
    fn test_active_connection_released_on_panic() {
        let metrics = Arc::new(MetricsCollector::new());
        let guard = ActiveConnection::new(Arc::clone(&metrics));
        assert_eq!(metrics.active_threads(), 1);

        let result = thread::spawn(move || {
            let _guard = guard;
            panic!("connection thread died");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(metrics.active_threads(), 0);
    }

    #[test]
    fn test_serve_releases_active_threads() {
        let fetch = |_: &str, _: MediaMode, _: &str| Outcome::Done;
        let manager = JobManager::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(fetch),
            WorkerLimits::default(),
        );
        let server = Server::with_components(Config::default(), manager, Arc::new(EmptyCatalog));
        let metrics = Arc::clone(server.metrics());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || server.serve(listener));

        let path = format!("GET /api/channel?url=%40c&start={}&count=1 HTTP/1.0\r\n\r\n", usize::MAX);
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(path.as_bytes()).unwrap();
        let mut buf = String::new();
        client.read_to_string(&mut buf).unwrap();
        assert!(buf.contains("400 Bad Request"), "got: {}", buf);

        let deadline = Instant::now() + Duration::from_secs(5);
        while metrics.active_threads() != 0 {
            assert!(Instant::now() < deadline, "connection never released");
            thread::sleep(Duration::from_millis(10));
        }
    }

    // ==================== Misc ====================

    #[test]
    fn test_handle_connection_peer_closed_immediately() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (router, metrics) = test_router();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &router, &metrics).unwrap();
            metrics
        });

        drop(TcpStream::connect(addr).unwrap());
        let metrics = t.join().unwrap();
        assert_eq!(metrics.get_snapshot().total_requests, 0);
    }

    #[test]
    fn test_content_length() {
        assert_eq!(content_length(b"POST / HTTP/1.0\r\ncontent-length: 12"), 12);
        assert_eq!(content_length(b"GET / HTTP/1.0\r\nHost: x"), 0);
        assert_eq!(content_length(b"POST / HTTP/1.0\r\nContent-Length: abc"), 0);
    }
}
