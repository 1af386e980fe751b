use std::io::Read as _;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use serde_json::Value;

/// Minimal valid 1x1 PNG, used as the stubbed illustration payload.
pub static TINY_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0,
    0, 0, 181, 28, 12, 2, 0, 0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 252, 255, 23, 0, 2, 3, 1, 128,
    110, 220, 25, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

#[derive(Debug, Clone)]
pub struct GenAiStubConfig {
    pub outline_behavior: OutlineBehavior,
    /// Model id served as the image model; requests addressed to it get
    /// an inline PNG instead of text.
    pub image_model: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum OutlineBehavior {
    Valid,
    Malformed,
}

pub struct GenAiStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl GenAiStub {
    pub fn spawn(config: GenAiStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start genai stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1beta");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post
                    || !path.starts_with("/v1beta/models/")
                    || !path.ends_with(":generateContent")
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                let Some(prompt) = parsed
                    .pointer("/contents/0/parts/0/text")
                    .and_then(|v| v.as_str())
                else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing prompt").with_status_code(400),
                    );
                    continue;
                };

                let is_image_request =
                    path.contains(&format!("/models/{}:", config.image_model));

                let parts = if is_image_request {
                    let data = base64::engine::general_purpose::STANDARD.encode(TINY_PNG);
                    serde_json::json!([
                        { "text": "Here is your illustration." },
                        { "inlineData": { "mimeType": "image/png", "data": data } },
                    ])
                } else {
                    let text = match text_response(prompt, config.outline_behavior) {
                        Ok(text) => text,
                        Err(message) => {
                            let _ = request.respond(
                                tiny_http::Response::from_string(message).with_status_code(400),
                            );
                            continue;
                        }
                    };
                    serde_json::json!([ { "text": text } ])
                };

                let response_body = serde_json::json!({
                    "candidates": [
                        { "content": { "role": "model", "parts": parts } }
                    ],
                    "modelVersion": "stub-model",
                });

                let mut response = tiny_http::Response::from_string(response_body.to_string())
                    .with_status_code(200);
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                response = response.with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for GenAiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn text_response(prompt: &str, outline_behavior: OutlineBehavior) -> Result<String, String> {
    if prompt.contains("Create a detailed outline") {
        return Ok(match outline_behavior {
            OutlineBehavior::Valid => outline_json(),
            OutlineBehavior::Malformed => "Certainly! Let me think about chapters...".to_owned(),
        });
    }
    if prompt.contains("book cover design") {
        return Ok("Stub cover direction: bold type over brushed steel.".to_owned());
    }
    if prompt.contains("Write Chapter") {
        return Ok("Draft prose about patient machines learning to dream.".to_owned());
    }
    if prompt.contains("Please edit the following chapter") {
        // Exactly ten words; pipeline tests assert the recorded word count.
        return Ok("The robots woke early and chose kindness over conquest today.".to_owned());
    }
    if prompt.contains("engaging and creative title") {
        return Ok("Stub Headline".to_owned());
    }
    if prompt.contains("fictional short story") {
        return Ok("Once, a small machine kept a lighthouse burning.".to_owned());
    }
    if prompt.contains("Please edit the following story") {
        return Ok("Once, a small machine kept the lighthouse burning.".to_owned());
    }
    Err(format!("unknown prompt mode: {prompt}"))
}

fn outline_json() -> String {
    serde_json::json!({
        "book_title": "Stub Robots Book",
        "book_description": "A stub premise about robots.",
        "chapters": [
            {
                "chapter_number": 1,
                "chapter_title": "Power On",
                "synopsis": "The first machines wake.",
                "key_points": ["wake", "city"],
            },
            {
                "chapter_number": 2,
                "chapter_title": "Power Down",
                "synopsis": "The machines rest.",
                "key_points": ["rest"],
            },
        ],
    })
    .to_string()
}
