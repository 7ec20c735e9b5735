use crate::payload::{Ack, CalibsResponse, DistanceReading};
use crate::settings::DeviceSettings;
use cuve_core::{Calibration, CuveError, Result, TankLevels};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Longest slice of an error body kept in [`CuveError::Server`].
const MAX_ERROR_BODY: usize = 200;

/// HTTP client for the sensor's web server.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    base: String,
    http: reqwest::Client,
}

impl DeviceClient {
    /// Create a client for `base_url` (e.g. `"http://192.168.4.1"`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cuve/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CuveError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// `GET /distance` — latest measurement.
    pub async fn distance(&self) -> Result<DistanceReading> {
        self.fetch_json(self.http.get(self.url("/distance"))).await
    }

    /// `GET /calibs` — the device's calibration table.
    pub async fn calibrations(&self) -> Result<Vec<Calibration>> {
        let resp: CalibsResponse = self.fetch_json(self.http.get(self.url("/calibs"))).await?;
        Ok(resp.calibs)
    }

    /// `POST /save_calib` — bind the current measurement to `height` in slot `id`.
    ///
    /// The device refuses (`err: "no echo"`) when it has no valid reading.
    pub async fn save_calibration(&self, id: u32, height: f64) -> Result<()> {
        let form = [("id", id.to_string()), ("height", height.to_string())];
        self.post_ack(self.http.post(self.url("/save_calib")).form(&form)).await
    }

    /// `POST /clear_calib` — forget all calibration points.
    pub async fn clear_calibrations(&self) -> Result<()> {
        self.post_ack(self.http.post(self.url("/clear_calib"))).await
    }

    /// `POST /setCuve` — store the empty/full tank distances.
    ///
    /// Values go both in the query string and the form body; firmware
    /// revisions differ in which one they read.
    pub async fn set_tank_levels(&self, levels: TankLevels) -> Result<()> {
        let params = [
            ("vide", levels.vide.to_string()),
            ("pleine", levels.pleine.to_string()),
        ];
        let req = self
            .http
            .post(self.url("/setCuve"))
            .query(&params)
            .form(&params);
        self.post_ack(req).await
    }

    /// `POST /send_mqtt` — publish the current measurement now.
    pub async fn send_mqtt(&self) -> Result<()> {
        self.post_ack(self.http.post(self.url("/send_mqtt"))).await
    }

    /// `POST /ping` — liveness signal. The response body is ignored.
    pub async fn ping(&self, page: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.url("/ping"))
            .form(&[("page", page)])
            .send()
            .await
            .map_err(network)?;
        check_status(resp).await.map(drop)
    }

    /// `GET /api/config` — device configuration (passwords masked).
    pub async fn settings(&self) -> Result<DeviceSettings> {
        let req = self
            .http
            .get(self.url("/api/config"))
            .header(reqwest::header::CACHE_CONTROL, "no-store");
        self.fetch_json(req).await
    }

    /// `POST /api/config` — persist configuration.
    ///
    /// Sends [`DeviceSettings::to_update`], so unchanged passwords are omitted.
    pub async fn update_settings(&self, settings: &DeviceSettings) -> Result<()> {
        let body = settings.to_update();
        self.post_ack(self.http.post(self.url("/api/config")).json(&body)).await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await.map_err(network)?;
        let body = check_status(resp).await?;
        serde_json::from_str(&body).map_err(|e| CuveError::Parse(format!("{e}: {}", excerpt(&body))))
    }

    async fn post_ack(&self, req: RequestBuilder) -> Result<()> {
        let ack: Ack = self.fetch_json(req).await?;
        debug!(ok = ack.ok, err = ?ack.err, "device acknowledged");
        ack.into_result()
    }
}

/// Read the body, turning non-2xx answers into [`CuveError::Server`].
async fn check_status(resp: Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.map_err(network)?;
    if !status.is_success() {
        return Err(CuveError::Server {
            status:  status.as_u16(),
            message: excerpt(&body),
        });
    }
    Ok(body)
}

fn network(e: reqwest::Error) -> CuveError {
    CuveError::Network(e.to_string())
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}
