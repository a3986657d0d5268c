#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl StubResponse {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
        }
    }

    pub fn bytes(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    pub fn text(status: u16, content_type: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type,
            body: body.as_bytes().to_vec(),
        }
    }
}

type Routes = Arc<Mutex<HashMap<String, StubResponse>>>;

/// Serves canned responses keyed by request path (query string ignored) and
/// records every requested URL.
pub struct ArchiveStub {
    pub base_url: String,
    routes: Routes,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ArchiveStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start archive stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let served = Arc::clone(&routes);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                recorded.lock().expect("lock requests").push(url.clone());
                let path = url.split('?').next().unwrap_or(&url);

                let route = served.lock().expect("lock routes").get(path).cloned();
                let Some(route) = route else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                };

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    route.content_type.as_bytes(),
                )
                .expect("build header");
                let response = tiny_http::Response::from_data(route.body)
                    .with_status_code(route.status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            routes,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn route(&self, path: impl Into<String>, response: StubResponse) {
        self.routes
            .lock()
            .expect("lock routes")
            .insert(path.into(), response);
    }

    /// Serves an item record plus a JPEG for each of its scans.
    pub fn add_item(&self, item: serde_json::Value) {
        let id = item["id"].as_str().unwrap_or_default().to_owned();
        if let Some(scans) = item["scans"].as_array() {
            for scan in scans {
                for resource in scan["resources"].as_array().into_iter().flatten() {
                    let url = resource["url"].as_str().unwrap_or_default();
                    let path = url.strip_prefix(&self.base_url).unwrap_or(url);
                    self.route(path, StubResponse::bytes("image/jpeg", tiny_jpeg(16, 24)));
                }
            }
        }
        self.route(format!("/api/entities/{id}"), StubResponse::json(item));
    }

    pub fn api_url(&self) -> String {
        format!("{}/api/entities", self.base_url)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock requests").clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.starts_with(prefix))
            .count()
    }
}

impl Drop for ArchiveStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A header-only baseline JPEG with a JFIF density of 72 dpi.
pub fn tiny_jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&[
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x01, 0x00, 0x48, 0x00,
        0x48, 0x00, 0x00,
    ]);
    bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

/// Item record with `pages` scans served from `<base>/scans/<id>/<n>.jpg`.
pub fn item_json(
    base_url: &str,
    id: &str,
    slug: &str,
    pages: usize,
    resources: serde_json::Value,
) -> serde_json::Value {
    let scans: Vec<serde_json::Value> = (1..=pages)
        .map(|page| {
            serde_json::json!({
                "resources": [
                    { "url": format!("{base_url}/scans/{id}/{page}.jpg"), "mime": "image/jpeg" }
                ]
            })
        })
        .collect();
    serde_json::json!({
        "id": id,
        "title": format!("Title of {id}"),
        "slug": slug,
        "date": "1925-05-01",
        "creator_name": "Kowalski, Jan",
        "keywords": ["prasa", "Warszawa"],
        "scans": scans,
        "resources": resources,
    })
}
