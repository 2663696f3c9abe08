//! HTTP gateway
//!
//! hyper http1 with TokioIo; one task per connection. Every route under
//! `/api/sessions/{id}` works on that session's workflow, wallet and chats.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::session::{Session, SessionFactory, SessionStore};
use crate::analysis::ImageFile;
use crate::backend::{HttpBackend, TriageClient, WidgetChatClient};
use crate::chain::{ConfirmationPolicy, NetworkParams, XyraChainContract};
use crate::config::Args;
use crate::mint::Minter;
use crate::report::ReportGenerator;
use crate::types::{Result, XyraError};
use crate::vault;
use crate::wallet::{LocalWallet, WalletProvider};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Header carrying the selected file's name on upload
pub const FILE_NAME_HEADER: &str = "x-file-name";
/// Header carrying the CID of a downloaded report
pub const REPORT_CID_HEADER: &str = "x-report-cid";

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub sessions: SessionStore,
    pub minter: Arc<Minter>,
    pub reports: ReportGenerator,
}

impl AppState {
    /// Build live clients from configuration
    pub fn from_args(args: &Args) -> Result<Self> {
        let timeout = args.request_timeout();
        let network = NetworkParams::for_chain(args.chain_id, &args.rpc_url);

        let wallet: Option<Arc<dyn WalletProvider>> = match &args.private_key {
            Some(key) => {
                let wallet = LocalWallet::new(key, network.clone(), timeout)?;
                info!("Gateway wallet: {}", wallet.address().to_checksum());
                Some(Arc::new(wallet))
            }
            None => {
                warn!("No PRIVATE_KEY set; wallet and mint routes are disabled");
                None
            }
        };

        let factory = SessionFactory {
            backend: Arc::new(HttpBackend::new(args.backend_url.clone(), timeout)?),
            wallet,
            widget: Arc::new(WidgetChatClient::new(&args.backend_url, timeout)?),
            triage: Arc::new(TriageClient::new(&args.triage_url, timeout)?),
        };

        let contract = XyraChainContract::new(
            args.contract_address.parse()?,
            ConfirmationPolicy {
                poll_interval: args.confirmation_poll(),
                max_polls: args.confirmation_max_polls,
            },
        );

        Ok(Self {
            sessions: SessionStore::new(factory, args.session_ttl()),
            minter: Arc::new(Minter::new(contract, network, args.chain_switch_settle())),
            reports: ReportGenerator::new(timeout)?,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>, listen: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    info!("XyraChain gateway listening on {}", listen);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req: Request<Incoming>| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(to_boxed(route(state, req).await))
}

/// Dispatch a request; errors become JSON error responses
pub async fn route<B>(state: Arc<AppState>, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let outcome = match (method.clone(), path.as_str()) {
        (Method::OPTIONS, _) => Ok(preflight_response()),
        (Method::GET, "/health") | (Method::GET, "/healthz") => Ok(json_response(
            StatusCode::OK,
            &serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "sessions": state.sessions.len(),
            }),
        )),
        (Method::POST, "/api/sessions") => {
            let session = state.sessions.create();
            Ok(json_response(
                StatusCode::CREATED,
                &serde_json::json!({ "sessionId": session.id }),
            ))
        }
        (Method::GET, "/api/vault") => Ok(json_response(StatusCode::OK, &vault::mock_vault())),
        (Method::GET, "/api/profile") => Ok(json_response(StatusCode::OK, &vault::mock_profile())),
        (_, p) if p.starts_with("/api/sessions/") => {
            let rest = &p["/api/sessions/".len()..];
            let (id, action) = rest.split_once('/').unwrap_or((rest, ""));
            match state.sessions.get(id) {
                Ok(session) => session_route(&state, session, method.clone(), action, req).await,
                Err(e) => Err(e),
            }
        }
        _ => Err(XyraError::NotFound(format!("{} {}", method, path))),
    };

    match outcome {
        Ok(response) => response,
        Err(e) => {
            if e.status_code().is_server_error() {
                error!("{} {} failed: {}", method, path, e);
            } else {
                debug!("{} {} rejected: {}", method, path, e);
            }
            error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: Option<crate::chat::ChatMessage>,
    messages: Vec<crate::chat::ChatMessage>,
}

async fn session_route<B>(
    state: &AppState,
    session: Arc<Session>,
    method: Method,
    action: &str,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match (method, action) {
        (Method::GET, "analysis") => ok(&session.workflow.snapshot().await),
        (Method::POST, "analysis/file") => {
            let mime = header_str(&req, CONTENT_TYPE.as_str()).unwrap_or_default();
            let name = header_str(&req, FILE_NAME_HEADER).unwrap_or_else(|| "upload".to_string());
            let file = match read_body(req).await {
                Ok(bytes) => ImageFile::new(name, mime, bytes),
                Err(e) => Err(e),
            }
            .map_err(|e| session.notifier.report(e))?;
            session.workflow.select_file(file).await?;
            ok(&session.workflow.snapshot().await)
        }
        (Method::POST, "analysis/start") => ok(&session.workflow.start_analysis().await?),
        (Method::POST, "analysis/reset") => {
            session.workflow.reset().await;
            ok(&session.workflow.snapshot().await)
        }
        (Method::GET, "report") => {
            let (result, file) = session.workflow.completed("download a report").await?;
            let account = match &session.wallet {
                Some(wallet) => wallet.address().await.map(|a| a.to_checksum()),
                None => None,
            };
            let report = state
                .reports
                .generate(&result, &file, account.as_deref())
                .await?;
            Ok(pdf_response(report))
        }
        (Method::GET, "wallet") => match &session.wallet {
            Some(wallet) => ok(&wallet.state().await),
            None => ok(&crate::wallet::WalletState {
                address: None,
                short_address: None,
                connected: false,
            }),
        },
        (Method::POST, "wallet/connect") => {
            let wallet = session.wallet()?;
            wallet
                .connect()
                .await
                .map_err(|e| session.notifier.report(e))?;
            ok(&wallet.state().await)
        }
        (Method::POST, "wallet/disconnect") => {
            let wallet = session.wallet()?;
            wallet.disconnect().await;
            ok(&wallet.state().await)
        }
        (Method::POST, "mint") => {
            let wallet = session.wallet.as_ref().ok_or(XyraError::WalletNotConnected)?;
            ok(&state.minter.mint(&session.workflow, wallet).await?)
        }
        (Method::GET, "reports") => {
            let wallet = session.wallet()?;
            let account = wallet.require_address().await?;
            let reports = state
                .minter
                .contract()
                .get_my_reports(wallet.provider(), account)
                .await?;
            ok(&reports)
        }
        (Method::GET, "chat") => ok(&session.chat.messages().await),
        (Method::GET, "triage") => ok(&session.triage.messages().await),
        (Method::POST, "chat") | (Method::POST, "triage") => {
            let chat = if action == "chat" {
                &session.chat
            } else {
                &session.triage
            };
            let body: MessageBody = serde_json::from_slice(&read_body(req).await?)
                .map_err(|e| XyraError::Validation(format!("invalid JSON body: {}", e)))?;
            let reply = chat.send(&body.message).await?;
            ok(&ChatResponse {
                reply,
                messages: chat.messages().await,
            })
        }
        (Method::GET, "notices") => ok(&session.notifier.history()),
        (method, action) => Err(XyraError::NotFound(format!(
            "{} /api/sessions/{}/{}",
            method, session.id, action
        ))),
    }
}

fn ok<T: Serialize + ?Sized>(value: &T) -> Result<Response<Full<Bytes>>> {
    Ok(json_response(StatusCode::OK, value))
}

fn header_str<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn read_body<B>(req: Request<B>) -> Result<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(req.into_body(), MAX_UPLOAD_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!("Rejecting body over {} bytes", MAX_UPLOAD_BYTES);
            Err(XyraError::Validation(format!(
                "request body exceeds {} bytes",
                MAX_UPLOAD_BYTES
            )))
        }
        Err(e) => Err(XyraError::Validation(format!(
            "failed to read request body: {}",
            e
        ))),
    }
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

fn base_response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    response
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(json) => base_response(status, "application/json", Bytes::from(json)),
        Err(e) => error_response(&XyraError::from(e)),
    }
}

fn error_response(err: &XyraError) -> Response<Full<Bytes>> {
    base_response(
        err.status_code(),
        "application/json",
        Bytes::from(err.to_json().to_string()),
    )
}

fn pdf_response(report: crate::report::Report) -> Response<Full<Bytes>> {
    let mut response = base_response(StatusCode::OK, "application/pdf", Bytes::from(report.bytes));
    let headers = response.headers_mut();
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", report.file_name))
    {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&report.cid) {
        headers.insert(REPORT_CID_HEADER, value);
    }
    response
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = base_response(StatusCode::OK, "text/plain", Bytes::new());
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Headers", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}
