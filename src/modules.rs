//! Host utility surface for user scripts
//!
//! Scripts written against the documented surface expect `console`, `JSON`,
//! `fetch` and `require` to exist; their absence would silently break them.
//! `console` and `JSON` are value bindings (see `bindings.rs`), while
//! `require` and `fetch` live in the interpreter's function namespace and
//! are registered here, once per step invocation.

use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Map};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use url::Url;

/// `console.log` / `console.warn` / `console.error`, routed to the host log
#[derive(Debug, Clone, Copy)]
pub struct ConsoleModule;

/// `JSON.parse` / `JSON.stringify`
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec;

/// HTTP primitive behind `fetch` and `require("http")`.
///
/// Shared, stateless reference across iterations; requests block the step
/// invocation until they settle on the async runtime.
#[derive(Clone)]
pub struct HttpModule {
    client: reqwest::Client,
    handle: Handle,
}

impl HttpModule {
    pub fn new(client: reqwest::Client, handle: Handle) -> Self {
        Self { client, handle }
    }

    fn request_blocking(
        &self,
        method: &str,
        url_text: &str,
        headers: Option<&Map>,
        body: Option<String>,
    ) -> Map {
        // Script-driven requests stay on http(s)
        let url = match Url::parse(url_text) {
            Ok(url) => url,
            Err(e) => return failure_map(format!("Invalid URL '{}': {}", url_text, e)),
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            return failure_map(format!("Unsupported URL scheme '{}'", url.scheme()));
        }

        let mut request = if method.eq_ignore_ascii_case("POST") {
            self.client.post(url)
        } else if method.eq_ignore_ascii_case("PUT") {
            self.client.put(url)
        } else if method.eq_ignore_ascii_case("DELETE") {
            self.client.delete(url)
        } else {
            self.client.get(url) // Default to GET
        };

        if let Some(headers) = headers {
            for (key, value) in headers.iter() {
                if let Ok(value) = value.clone().into_string() {
                    request = request.header(key.as_str(), value);
                }
            }
        }

        if let Some(body) = body {
            request = request.body(body);
        }

        let outcome = self.handle.block_on(async {
            let response = request.send().await?;
            let status = response.status();
            let headers: Vec<(String, String)> = response
                .headers()
                .iter()
                .filter_map(|(key, value)| {
                    value.to_str().ok().map(|v| (key.to_string(), v.to_string()))
                })
                .collect();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        });

        match outcome {
            Ok((status, headers, body)) => {
                let mut map = Map::new();
                map.insert("ok".into(), Dynamic::from(status.is_success()));
                map.insert("status".into(), Dynamic::from(status.as_u16() as i64));
                map.insert(
                    "statusText".into(),
                    Dynamic::from(status.canonical_reason().unwrap_or("").to_string()),
                );
                let mut header_map = Map::new();
                for (key, value) in headers {
                    header_map.insert(key.into(), Dynamic::from(value));
                }
                map.insert("headers".into(), Dynamic::from(header_map));
                map.insert("body".into(), Dynamic::from(body));
                map
            }
            Err(e) => failure_map(format!("HTTP request failed: {}", e)),
        }
    }

    /// Dispatch from a `fetch`-style options map: method, headers, body
    fn fetch_with_options(&self, url: &str, options: &Map) -> Map {
        let method = options
            .get("method")
            .and_then(|v| v.clone().into_string().ok())
            .unwrap_or_else(|| "GET".to_string());
        let headers = options.get("headers").and_then(|v| v.clone().try_cast::<Map>());
        let body = options.get("body").and_then(|v| v.clone().into_string().ok());
        self.request_blocking(&method, url, headers.as_ref(), body)
    }
}

fn failure_map(error: String) -> Map {
    let mut map = Map::new();
    map.insert("ok".into(), Dynamic::from(false));
    map.insert("error".into(), Dynamic::from(error));
    map
}

/// Register the whole host utility surface on the engine
pub fn register(engine: &mut Engine, http: HttpModule) {
    register_console(engine);
    register_json(engine);
    register_http(engine, http.clone());
    register_require(engine, http);
}

fn register_console(engine: &mut Engine) {
    engine.register_type_with_name::<ConsoleModule>("Console");

    engine.register_fn("log", |_: &mut ConsoleModule, message: Dynamic| {
        info!(target: "script", "{}", message);
    });
    engine.register_fn("warn", |_: &mut ConsoleModule, message: Dynamic| {
        warn!(target: "script", "{}", message);
    });
    engine.register_fn("error", |_: &mut ConsoleModule, message: Dynamic| {
        error!(target: "script", "{}", message);
    });
}

fn register_json(engine: &mut Engine) {
    engine.register_type_with_name::<JsonCodec>("Json");

    engine.register_fn(
        "parse",
        |_: &mut JsonCodec, text: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let value: Value = serde_json::from_str(&text)
                .map_err(|e| -> Box<EvalAltResult> { format!("JSON parse error: {}", e).into() })?;
            rhai::serde::to_dynamic(value)
        },
    );

    engine.register_fn(
        "stringify",
        |_: &mut JsonCodec, value: Dynamic| -> Result<ImmutableString, Box<EvalAltResult>> {
            let value: Value = rhai::serde::from_dynamic(&value)?;
            serde_json::to_string(&value)
                .map(Into::into)
                .map_err(|e| format!("JSON stringify error: {}", e).into())
        },
    );
}

fn register_http(engine: &mut Engine, http: HttpModule) {
    engine.register_type_with_name::<HttpModule>("Http");

    // Free-function form: fetch(url), fetch(url, options)
    let fetch = http.clone();
    engine.register_fn("fetch", move |url: ImmutableString| -> Map {
        fetch.request_blocking("GET", &url, None, None)
    });
    let fetch = http;
    engine.register_fn("fetch", move |url: ImmutableString, options: Map| -> Map {
        fetch.fetch_with_options(&url, &options)
    });

    // Module-object form, for require("http")
    engine.register_fn("get", |http: &mut HttpModule, url: ImmutableString| -> Map {
        http.request_blocking("GET", &url, None, None)
    });
    engine.register_fn(
        "post",
        |http: &mut HttpModule, url: ImmutableString, body: ImmutableString| -> Map {
            http.request_blocking("POST", &url, None, Some(body.to_string()))
        },
    );
    engine.register_fn("request", |http: &mut HttpModule, options: Map| -> Map {
        let Some(url) = options.get("url").and_then(|v| v.clone().into_string().ok()) else {
            return failure_map("Missing 'url' in options".to_string());
        };
        http.fetch_with_options(&url, &options)
    });
}

/// The module-resolution helper: maps a module name to a host module object
fn register_require(engine: &mut Engine, http: HttpModule) {
    engine.register_fn(
        "require",
        move |name: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            match name.as_str() {
                "http" => Ok(Dynamic::from(http.clone())),
                "json" => Ok(Dynamic::from(JsonCodec)),
                "console" => Ok(Dynamic::from(ConsoleModule)),
                other => Err(format!(
                    "Unknown module '{}' (available: console, http, json)",
                    other
                )
                .into()),
            }
        },
    );
}
