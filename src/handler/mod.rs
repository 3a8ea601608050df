//! Request resolution.
//!
//! [`Handler`] turns a [`Request`] into a [`Response`] in a single pass:
//!
//! 1. Percent-decode the path and reject anything that climbs above the root.
//! 2. Answer with a redirect if one applies (clean URLs, trailing slashes,
//!    explicit rules). Rewrites are not considered for redirected requests.
//! 3. Stat the path, compute the rewrite target and, for missing paths or
//!    directories, look for an index or `.html` sibling.
//! 4. Render a directory listing, answer 404, or stream the resolved file.
//!
//! Missing files never surface as errors; they steer the fallbacks above. Any
//! other filesystem error ends the request with a 500 carrying its message.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::{CompiledConfig, Config, ConfigError};
use crate::fs::{FileSystem, Metadata, OsFs, is_not_found};
use crate::http::{Method, Request, Response, StatusCode};
use crate::rules::{apply_rewrites, should_redirect};

pub mod files;
pub mod headers;
pub mod listing;
pub mod render;

pub use files::{DEFAULT_EXTENSION, Found, find_related};
pub use headers::compose_headers;
pub use listing::{Breadcrumb, DirectoryEntry, EntryType, Listing, Outcome, list_directory};
pub use render::{HtmlRenderer, JsonRenderer, Render, Rendered};

use files::{join_root, probe};

/// Characters escaped in a `Location` header, mirroring what a browser's
/// `encodeURI` leaves alone.
const LOCATION: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Errors that end a request early.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A filesystem failure other than not-found. Answered with 500.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The path is not valid percent-encoded UTF-8. Answered with 400.
    #[error("malformed request path: {0}")]
    MalformedPath(String),

    /// The path climbs above the serve root. Answered with 400.
    #[error("request path escapes the serve root: {0}")]
    OutsideRoot(String),

    #[error("failed to render listing: {0}")]
    Render(#[from] serde_json::Error),

    #[error("failed to write listing page: {0}")]
    Page(#[from] fmt::Error),
}

impl HandlerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MalformedPath(_) | Self::OutsideRoot(_) => StatusCode::BadRequest,
            Self::Io(_) | Self::Render(_) | Self::Page(_) => StatusCode::InternalServerError,
        }
    }
}

// Working state for one request.
struct RequestState {
    relative: String,
    absolute: PathBuf,
    metadata: Option<Metadata>,
    rewritten: Option<String>,
    accepts_json: bool,
    head: bool,
}

/// Resolves requests against a directory tree.
///
/// `F` is the filesystem; tests use [`MemoryFs`](crate::fs::MemoryFs). The
/// configuration is compiled once on construction and shared by every request.
///
/// # Examples
///
/// ```
/// use rserve::config::Config;
/// use rserve::fs::MemoryFs;
/// use rserve::handler::Handler;
/// use rserve::http::{Request, StatusCode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fs = MemoryFs::new().file("/srv/about.html", "<h1>About</h1>");
/// let handler = Handler::with_fs(Config::default(), "/srv", fs).unwrap();
///
/// let (request, _) = Request::parse(b"GET /about HTTP/1.1\r\n\r\n").unwrap();
/// let response = handler.handle(&request).await;
/// assert_eq!(response.status(), StatusCode::Ok);
/// # }
/// ```
pub struct Handler<F = OsFs> {
    config: CompiledConfig,
    root: PathBuf,
    fs: F,
    html: Box<dyn Render>,
}

impl Handler<OsFs> {
    /// Serves `config.public` under `root` from the real filesystem.
    ///
    /// # Errors
    ///
    /// Anything [`Config::compile`] rejects.
    pub fn new(config: Config, root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::with_fs(config, root, OsFs)
    }
}

impl<F: FileSystem> Handler<F> {
    /// Serves `config.public` under `root` from `fs`.
    ///
    /// # Errors
    ///
    /// Anything [`Config::compile`] rejects.
    pub fn with_fs(config: Config, root: impl AsRef<Path>, fs: F) -> Result<Self, ConfigError> {
        let root = config.serve_root(root);
        Ok(Self {
            config: config.compile()?,
            root,
            fs,
            html: Box::new(HtmlRenderer),
        })
    }

    /// Replaces the HTML listing renderer.
    #[must_use]
    pub fn renderer(mut self, html: impl Render + 'static) -> Self {
        self.html = Box::new(html);
        self
    }

    /// Directory files are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `request`. Never fails: errors become 400 or 500 responses.
    pub async fn handle(&self, request: &Request) -> Response {
        let head = *request.method() == Method::Head;
        match self.resolve(request).await {
            Ok(response) => response,
            Err(e) => {
                let status = e.status();
                if status == StatusCode::InternalServerError {
                    error!(path = %request.path(), error = %e, "request failed");
                    return plain(status, e.to_string(), head);
                }
                debug!(path = %request.path(), error = %e, "rejecting request");
                let accepts_json = request.accepts_json();
                match self.send_error(status, accepts_json, head).await {
                    Ok(response) => response,
                    Err(e) => {
                        error!(path = %request.path(), error = %e, "error page failed");
                        plain(StatusCode::InternalServerError, e.to_string(), head)
                    }
                }
            }
        }
    }

    async fn resolve(&self, request: &Request) -> Result<Response, HandlerError> {
        let config = &self.config;
        let relative = decode_path(request.path())?;
        if escapes_root(&relative) {
            return Err(HandlerError::OutsideRoot(relative));
        }

        let clean_url = config.clean_urls.applies(&relative);
        if let Some(redirect) = should_redirect(&relative, config, clean_url) {
            debug!(path = %relative, target = %redirect.target, status = %redirect.status, "redirecting");
            return Ok(Response::new(redirect.status)
                .header("Location", location(&redirect.target, request.query_string())));
        }

        let absolute = join_root(&self.root, &crate::pattern::normalize(&relative));
        let metadata = match probe(&self.fs, &absolute, config.symlinks).await {
            Ok(metadata) => Some(metadata),
            Err(e) if is_not_found(&e) => None,
            Err(e) => return Err(e.into()),
        };

        let rewritten = apply_rewrites(&relative, &config.rewrites);
        if let Some(target) = &rewritten {
            debug!(path = %relative, target = %target, "rewritten");
        }

        let mut state = RequestState {
            relative,
            absolute,
            metadata,
            rewritten,
            accepts_json: request.accepts_json(),
            head: *request.method() == Method::Head,
        };

        let probe_related = state.metadata.as_ref().is_none_or(Metadata::is_dir);
        if probe_related && (clean_url || state.rewritten.is_some()) {
            if let Some(found) = find_related(
                &self.fs,
                &self.root,
                &state.relative,
                state.rewritten.as_deref(),
                DEFAULT_EXTENSION,
                config.symlinks,
            )
            .await?
            {
                state.absolute = found.path;
                state.metadata = Some(found.metadata);
            }
        }

        if state.metadata.as_ref().is_some_and(Metadata::is_dir) {
            match list_directory(&self.fs, config, &self.root, &state.relative, &state.absolute)
                .await?
            {
                Some(Outcome::Listing(listing)) => {
                    let rendered = if state.accepts_json {
                        JsonRenderer.render(&listing)?
                    } else {
                        self.html.render(&listing)?
                    };
                    debug!(path = %state.relative, entries = listing.files.len(), "listing rendered");
                    return Ok(buffered(
                        StatusCode::Ok,
                        rendered.content_type,
                        rendered.body,
                        state.head,
                    ));
                }
                Some(Outcome::Single(found)) => {
                    state.absolute = found.path;
                    state.metadata = Some(found.metadata);
                }
                None => state.metadata = None,
            }
        }

        match state.metadata.take() {
            Some(metadata) => {
                let found = Found {
                    path: std::mem::take(&mut state.absolute),
                    metadata,
                };
                self.serve_file(&state, StatusCode::Ok, found).await
            }
            None => {
                debug!(path = %state.relative, "not found");
                self.send_error(StatusCode::NotFound, state.accepts_json, state.head)
                    .await
            }
        }
    }

    /// Answers with `status`: a JSON error object when JSON is accepted, else
    /// `<status>.html` from the root if it exists, else the reason phrase.
    async fn send_error(
        &self,
        status: StatusCode,
        accepts_json: bool,
        head: bool,
    ) -> Result<Response, HandlerError> {
        if accepts_json {
            let body = serde_json::to_vec(&serde_json::json!({
                "error": {
                    "code": status.error_code(),
                    "message": status.canonical_reason(),
                }
            }))?;
            return Ok(buffered(status, "application/json; charset=utf-8", body, head));
        }

        let page = format!("/{}.html", status.as_u16());
        let path = join_root(&self.root, &page);
        match probe(&self.fs, &path, self.config.symlinks).await {
            Ok(metadata) if metadata.is_file() => {
                let state = RequestState {
                    relative: page,
                    absolute: PathBuf::new(),
                    metadata: None,
                    rewritten: None,
                    accepts_json,
                    head,
                };
                self.serve_file(&state, status, Found { path, metadata }).await
            }
            Ok(_) => Ok(plain(status, status.canonical_reason(), head)),
            Err(e) if is_not_found(&e) => Ok(plain(status, status.canonical_reason(), head)),
            Err(e) => Err(e.into()),
        }
    }

    async fn serve_file(
        &self,
        state: &RequestState,
        status: StatusCode,
        found: Found,
    ) -> Result<Response, HandlerError> {
        let headers = compose_headers(
            &self.config.headers,
            &state.relative,
            state.rewritten.as_deref(),
            Some(&found),
        );
        let response = Response::new(status).headers(headers);
        if state.head {
            return Ok(response);
        }
        let stream = self.fs.open(&found.path).await?;
        Ok(response.stream(stream))
    }
}

fn buffered(status: StatusCode, content_type: &str, body: Vec<u8>, head: bool) -> Response {
    let response = Response::new(status)
        .header("Content-Type", content_type)
        .header("Content-Length", body.len().to_string());
    if head { response } else { response.body_bytes(body) }
}

fn plain(status: StatusCode, body: impl Into<String>, head: bool) -> Response {
    buffered(status, "text/plain; charset=utf-8", body.into().into_bytes(), head)
}

/// Percent-decodes a request path into UTF-8, rooted at `/`.
fn decode_path(raw: &str) -> Result<String, HandlerError> {
    let bytes = raw.as_bytes();
    let truncated = bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    });
    if truncated {
        return Err(HandlerError::MalformedPath(raw.to_owned()));
    }

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| HandlerError::MalformedPath(raw.to_owned()))?;
    if decoded.contains('\0') {
        return Err(HandlerError::MalformedPath(raw.to_owned()));
    }

    Ok(if decoded.starts_with('/') {
        decoded.into_owned()
    } else {
        format!("/{decoded}")
    })
}

fn escapes_root(path: &str) -> bool {
    let mut depth = 0usize;
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match depth.checked_sub(1) {
                Some(parent) => depth = parent,
                None => return true,
            },
            _ => depth += 1,
        }
    }
    false
}

fn location(target: &str, query: Option<&str>) -> String {
    let mut location = utf8_percent_encode(target, LOCATION).to_string();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        location.push(if location.contains('?') { '&' } else { '?' });
        location.push_str(query);
    }
    location
}
