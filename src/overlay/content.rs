use std::{
    borrow::Cow,
    fs,
    io::{BufRead, BufReader, Read, Write},
    net::{SocketAddr, TcpStream},
    path::{Component, Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use tauri::{
    http::{header::CONTENT_TYPE, Request, Response, StatusCode},
    Url,
};

/// URI scheme the built display surface and the fallback page are served on.
pub const SCHEME: &str = "hud";

const DEV_SERVER_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Where the overlay's page comes from, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    DevServer(Url),
    Bundle(PathBuf),
    Fallback,
}

/// Serves the display surface to the overlay webview and decides which
/// source it should load.
#[derive(Debug, Clone)]
pub struct ContentServer {
    dev_server_url: Option<Url>,
    bundle_dir: PathBuf,
}

impl ContentServer {
    pub fn new(dev_server_url: Option<Url>, bundle_dir: PathBuf) -> Self {
        Self {
            dev_server_url,
            bundle_dir,
        }
    }

    pub fn bundle_index(&self) -> PathBuf {
        self.bundle_dir.join("index.html")
    }

    pub fn resolve(&self) -> ContentSource {
        self.resolve_with(dev_server_reachable)
    }

    pub fn resolve_with<F>(&self, reachable: F) -> ContentSource
    where
        F: Fn(&Url) -> bool,
    {
        info!(
            "Display surface targets: dev_url={:?} index={}",
            self.dev_server_url.as_ref().map(Url::as_str),
            self.bundle_index().display()
        );

        if let Some(url) = &self.dev_server_url {
            if reachable(url) {
                return ContentSource::DevServer(url.clone());
            }
            warn!("Dev server {url} is not reachable, trying the built bundle");
        }

        let index = self.bundle_index();
        if index.is_file() {
            ContentSource::Bundle(index)
        } else {
            warn!("{} is missing, serving the fallback page", index.display());
            ContentSource::Fallback
        }
    }

    /// Handler for `hud://` requests. Unknown paths get a 404, and a missing
    /// bundle index gets the fallback page so the overlay is never blank.
    pub fn respond(&self, request: &Request<Vec<u8>>) -> Response<Cow<'static, [u8]>> {
        let path = request.uri().path();
        let relative = match path.trim_start_matches('/') {
            "" => "index.html",
            other => other,
        };

        let Some(file) = safe_join(&self.bundle_dir, relative) else {
            warn!("Rejected display surface request for {path}");
            return plain(StatusCode::FORBIDDEN, "forbidden");
        };

        match fs::read(&file) {
            Ok(bytes) => build(StatusCode::OK, mime_for(&file), Cow::Owned(bytes)),
            Err(_) if relative == "index.html" => build(
                StatusCode::OK,
                "text/html; charset=utf-8",
                Cow::Owned(self.fallback_html().into_bytes()),
            ),
            Err(err) => {
                warn!("Failed to serve {}: {err}", file.display());
                plain(StatusCode::NOT_FOUND, "not found")
            }
        }
    }

    /// Standalone page shown when neither the dev server nor the bundle loads.
    pub fn fallback_html(&self) -> String {
        let dev_url = self
            .dev_server_url
            .as_ref()
            .map(|url| url.to_string())
            .unwrap_or_else(|| "not set".into());
        let index = self.bundle_index().display().to_string();

        format!(
            r#"<!doctype html>
<html>
  <head>
    <meta charset="UTF-8" />
    <title>Stress Control HUD (Fallback)</title>
    <style>
      html, body {{ margin: 0; padding: 0; background: #111; color: #eee; font-family: Segoe UI, Arial, sans-serif; }}
      .wrap {{ padding: 24px; }}
      h1 {{ margin: 0 0 12px; font-size: 20px; }}
      p {{ margin: 8px 0; line-height: 1.4; }}
      code {{ background: #222; padding: 2px 6px; border-radius: 4px; }}
    </style>
  </head>
  <body>
    <div class="wrap">
      <h1>HUD fallback page</h1>
      <p>The display surface failed to load. Check the application log for details.</p>
      <p>Dev URL: <code>{}</code></p>
      <p>Index path: <code>{}</code></p>
    </div>
  </body>
</html>"#,
            escape_html(&dev_url),
            escape_html(&index)
        )
    }
}

/// The URL the overlay window navigates to for `source`.
pub fn entry_url(source: &ContentSource) -> Result<Url> {
    match source {
        ContentSource::DevServer(url) => Ok(url.clone()),
        ContentSource::Bundle(_) | ContentSource::Fallback => scheme_url("index.html"),
    }
}

fn scheme_url(path: &str) -> Result<Url> {
    // Windows webviews only accept custom schemes through the http workaround.
    let base = if cfg!(windows) {
        format!("http://{SCHEME}.localhost/")
    } else {
        format!("{SCHEME}://localhost/")
    };
    let url = format!("{base}{path}");
    Url::parse(&url).with_context(|| format!("Invalid display surface URL {url}"))
}

/// A dev server counts as reachable once it answers a plain `GET` with a
/// status below 400. An open port alone is not enough.
fn dev_server_reachable(url: &Url) -> bool {
    let Ok(addrs) = url.socket_addrs(|| None) else {
        return false;
    };
    addrs.iter().any(|addr| match request_status(addr, url) {
        Ok(status) if status < 400 => true,
        Ok(status) => {
            warn!("Dev server {url} answered with status {status}");
            false
        }
        Err(err) => {
            debug!("Dev server check of {addr} failed: {err:#}");
            false
        }
    })
}

fn request_status(addr: &SocketAddr, url: &Url) -> Result<u16> {
    let mut stream = TcpStream::connect_timeout(addr, DEV_SERVER_PROBE_TIMEOUT)?;
    stream.set_read_timeout(Some(DEV_SERVER_PROBE_TIMEOUT))?;
    stream.set_write_timeout(Some(DEV_SERVER_PROBE_TIMEOUT))?;

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => addr.to_string(),
    };
    let target = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    };
    let request =
        format!("GET {target} HTTP/1.0\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes())?;

    let mut status_line = String::new();
    BufReader::new(stream)
        .take(256)
        .read_line(&mut status_line)?;

    let mut parts = status_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code
            .parse()
            .with_context(|| format!("Malformed status line {status_line:?}")),
        _ => Err(anyhow!("No HTTP response (got {status_line:?})")),
    }
}

/// Joins `relative` under `root`, refusing anything that climbs out of it.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript",
        Some("css") => "text/css",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        _ => "application/octet-stream",
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn plain(status: StatusCode, body: &'static str) -> Response<Cow<'static, [u8]>> {
    build(status, "text/plain", Cow::Borrowed(body.as_bytes()))
}

fn build(
    status: StatusCode,
    mime: &'static str,
    body: Cow<'static, [u8]>,
) -> Response<Cow<'static, [u8]>> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, tauri::http::HeaderValue::from_static(mime));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(path: &str) -> Request<Vec<u8>> {
        Request::builder()
            .uri(format!("hud://localhost{path}"))
            .body(Vec::new())
            .unwrap()
    }

    fn dev_url() -> Url {
        Url::parse("http://localhost:5173/").unwrap()
    }

    #[test]
    fn reachable_dev_server_wins() {
        let dir = TempDir::new().unwrap();
        let server = ContentServer::new(Some(dev_url()), dir.path().to_path_buf());
        assert_eq!(
            server.resolve_with(|_| true),
            ContentSource::DevServer(dev_url())
        );
    }

    #[test]
    fn unreachable_dev_server_falls_back_to_bundle() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let server = ContentServer::new(Some(dev_url()), dir.path().to_path_buf());

        assert_eq!(
            server.resolve_with(|_| false),
            ContentSource::Bundle(dir.path().join("index.html"))
        );
    }

    #[test]
    fn nothing_available_means_fallback() {
        let dir = TempDir::new().unwrap();
        let server = ContentServer::new(None, dir.path().join("dist"));
        assert_eq!(server.resolve_with(|_| true), ContentSource::Fallback);
    }

    #[test]
    fn fallback_page_names_both_targets_escaped() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("<dist>");
        let server = ContentServer::new(Some(dev_url()), bundle.clone());

        let html = server.fallback_html();
        assert!(html.contains("http://localhost:5173/"));
        assert!(html.contains("&lt;dist&gt;"));
        assert!(!html.contains("<dist>"));

        let without_dev = ContentServer::new(None, bundle).fallback_html();
        assert!(without_dev.contains("<code>not set</code>"));
    }

    #[test]
    fn serves_bundle_files_with_mime_types() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("index.html"), "<p>hud</p>").unwrap();
        fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
        let server = ContentServer::new(None, dir.path().to_path_buf());

        let index = server.respond(&request("/"));
        assert_eq!(index.status(), StatusCode::OK);
        assert_eq!(index.body().as_ref(), b"<p>hud</p>");

        let script = server.respond(&request("/assets/app.js"));
        assert_eq!(script.headers()[CONTENT_TYPE], "text/javascript");
    }

    #[test]
    fn missing_index_serves_fallback_page() {
        let dir = TempDir::new().unwrap();
        let server = ContentServer::new(None, dir.path().to_path_buf());

        let response = server.respond(&request("/index.html"));
        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("HUD fallback page"));

        assert_eq!(
            server.respond(&request("/missing.css")).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn traversal_is_forbidden() {
        let dir = TempDir::new().unwrap();
        let server = ContentServer::new(None, dir.path().join("dist"));
        assert_eq!(
            server.respond(&request("/../config.json")).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn bundle_and_fallback_share_the_scheme_entry() {
        let url = entry_url(&ContentSource::Fallback).unwrap();
        assert!(url.as_str().ends_with("/index.html"));
        assert_eq!(entry_url(&ContentSource::DevServer(dev_url())).unwrap(), dev_url());
    }

    /// One-shot local server that answers the first connection with `reply`.
    fn serve_once(reply: &'static str) -> (Url, std::thread::JoinHandle<()>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 2 {
                line.clear();
            }
            let mut stream = stream;
            let _ = stream.write_all(reply.as_bytes());
        });
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        (url, handle)
    }

    #[test]
    fn dev_server_must_answer_http() {
        let (url, server) = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert!(dev_server_reachable(&url));
        server.join().unwrap();
    }

    #[test]
    fn open_port_without_http_is_not_a_dev_server() {
        let (url, server) = serve_once("");
        assert!(!dev_server_reachable(&url));
        server.join().unwrap();

        let (url, server) = serve_once("HTTP/1.1 404 Not Found\r\n\r\n");
        assert!(!dev_server_reachable(&url));
        server.join().unwrap();
    }

    #[test]
    fn closed_port_is_not_a_dev_server() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        assert!(!dev_server_reachable(&url));
    }
}
