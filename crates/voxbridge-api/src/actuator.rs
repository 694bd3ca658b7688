// Actuator HTTP client
//
// Wraps `reqwest::Client` with the two call shapes a voice command can
// turn into: a pin pulse on the default actuator, or a GET against an
// arbitrary user-configured URL.

use std::time::Duration;

use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

const PULSE_PATH: &str = "pulsePin";

/// Status code and body of a completed actuator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Actuators signal success with a plain `200`; anything else,
    /// including other 2xx codes, counts as a failed actuation.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// The first `max_chars` characters of the body, for log output.
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.body.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.body[..idx],
            None => &self.body,
        }
    }
}

/// HTTP client for the default actuator and custom endpoints.
///
/// Cheap to clone (the inner `reqwest::Client` is reference counted).
#[derive(Debug, Clone)]
pub struct ActuatorClient {
    http: reqwest::Client,
    actuator_base: Url,
}

impl ActuatorClient {
    /// Create a client for the actuator at `actuator_host`.
    ///
    /// `actuator_host` may be a bare host (`192.168.1.50`, `lamp.local:8080`)
    /// or a full base URL (`http://192.168.1.50/`).
    pub fn new(actuator_host: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let actuator_base = actuator_base_url(actuator_host)?;
        let http = transport.build_client()?;
        Ok(Self {
            http,
            actuator_base,
        })
    }

    /// The pulse endpoint for `pin` on the default actuator.
    pub fn pulse_url(&self, pin: u8) -> Result<Url, Error> {
        pulse_url(&self.actuator_base, pin)
    }

    /// Pulse `pin` on the default actuator.
    pub async fn pulse_pin(&self, pin: u8, timeout: Duration) -> Result<HttpResponse, Error> {
        let url = self.pulse_url(pin)?;
        self.get(url.as_str(), timeout).await
    }

    /// Issue a single GET against `url`, bounded by `timeout`.
    ///
    /// Non-200 answers are returned as responses, not errors, so callers can
    /// report the code the actuator gave back.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, Error> {
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::UnsupportedScheme {
                scheme: url.scheme().to_owned(),
            });
        }

        debug!(%url, timeout_ms = millis(timeout), "actuator GET");
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport(e, timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport(e, timeout))?;
        trace!(status, body_len = body.len(), "actuator response");

        Ok(HttpResponse { status, body })
    }
}

/// Normalise an actuator host into a base URL ending in `/`.
///
/// Bare hosts get an `http://` scheme; anything other than http/https is
/// rejected.
pub fn actuator_base_url(host: &str) -> Result<Url, Error> {
    let raw = if host.contains("://") {
        host.to_owned()
    } else {
        format!("http://{host}")
    };
    let mut url = Url::parse(&raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::UnsupportedScheme {
            scheme: url.scheme().to_owned(),
        });
    }
    // `join` replaces the last path segment unless the base ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// `{base}pulsePin?pin={pin}`
pub fn pulse_url(base: &Url, pin: u8) -> Result<Url, Error> {
    let mut url = base.join(PULSE_PATH)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("pin", &pin.to_string());
    Ok(url)
}

fn map_transport(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            timeout_ms: millis(timeout),
        }
    } else {
        Error::Transport(err)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
