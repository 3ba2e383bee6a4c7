use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    api::{
        AUTH_SESSION, Api, CAMERA_TOGGLE_VERSION, Endpoint, EndpointTable, INFO_API, Params,
        QUERY_PATH, SESSION_EXPIRED_CODE, merge_params, parse_envelope,
    },
    config::StationConfig,
    models::{
        Camera, CameraId, CameraListRawResponse, HomeModeInfoRawResponse, HomeModeState,
        MotionEnumRawResponse, MotionParamSaveRawResponse, MotionSetting, VideoFormat,
    },
    transport::{HttpResponse, HttpTransport, Transport},
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod transport;

pub use error::{Error, Result};

/// Session-based client for the Surveillance Station web API.
///
/// A client is usable once [`initialize`](Self::initialize) has discovered the
/// endpoint paths and logged in. Calls that find the session expired log in
/// again once and are retried with the new session id.
pub struct SessionClient {
    transport: Box<dyn Transport>,
    base_url: Url,
    config: StationConfig,
    endpoints: Option<EndpointTable>,
    sid: Option<String>,
}

impl SessionClient {
    pub fn new(config: StationConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout, config.verify_ssl)?;
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: StationConfig, transport: impl Transport + 'static) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/webapi/", config.url.trim_end_matches('/')))
            .map_err(|e| Error::Config(format!("Invalid station URL '{}': {e}", config.url)))?;

        Ok(SessionClient {
            transport: Box::new(transport),
            base_url,
            config,
            endpoints: None,
            sid: None,
        })
    }

    /// Builds a client and runs [`initialize`](Self::initialize).
    pub async fn connect(config: StationConfig) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.initialize().await?;
        Ok(client)
    }

    pub async fn initialize(&mut self) -> Result<()> {
        self.discover_endpoints().await?;
        self.login().await
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn discover_endpoints(&mut self) -> Result<()> {
        let url = self.base_url.join(QUERY_PATH)?;
        let names = Api::ALL.map(|api| api.wire_name()).join(",");
        let query = vec![
            ("api".to_string(), INFO_API.to_string()),
            ("method".to_string(), "Query".to_string()),
            ("version".to_string(), "1".to_string()),
            ("query".to_string(), names),
        ];

        let data = self.get_json(url, query).await.map_err(|e| match e {
            Error::SessionExpired(body) => Error::Api {
                code: Some(SESSION_EXPIRED_CODE),
                body,
            },
            other => other,
        })?;
        let endpoints = EndpointTable::from_discovery(&self.base_url, &data)?;

        debug!(base_url = %self.base_url, "Discovered Surveillance Station endpoints");
        self.endpoints = Some(endpoints);
        Ok(())
    }

    pub async fn login(&mut self) -> Result<()> {
        let (url, query) = {
            let auth = self.endpoint(Api::Auth)?;
            let query = vec![
                ("api".to_string(), auth.name.to_string()),
                ("method".to_string(), "Login".to_string()),
                ("version".to_string(), auth.version.to_string()),
                ("account".to_string(), self.config.username.clone()),
                ("passwd".to_string(), self.config.password.clone()),
                ("session".to_string(), AUTH_SESSION.to_string()),
                ("format".to_string(), "sid".to_string()),
            ];
            (auth.url.clone(), query)
        };

        let data = self.get_json(url, query).await.map_err(|e| match e {
            Error::Api { code, .. } => Error::Auth(describe_auth_failure(code)),
            Error::SessionExpired(_) => Error::Auth("Session expired during login".to_string()),
            other => other,
        })?;

        let sid = data
            .get("sid")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Auth("Login response did not include a session id".to_string()))?;

        self.sid = Some(sid.to_string());

        info!("Successfully logged in to Surveillance Station");
        Ok(())
    }

    /// Performs an authenticated JSON call and returns its `data` payload.
    ///
    /// `extra` is merged over the default `_sid`/`api`/`method`/`version`
    /// parameters, so callers may override any of them.
    pub async fn call(&mut self, api: Api, method: &str, extra: &[(&str, String)]) -> Result<Value> {
        let mut relogged = false;

        loop {
            let (url, query) = self.authenticated_request(api, method, extra)?;

            match self.get_json(url, query).await {
                Err(Error::SessionExpired(_)) if !relogged => {
                    warn!(api = %api, method, "Session expired, logging in again");
                    self.login().await?;
                    relogged = true;
                }
                Err(Error::SessionExpired(body)) => {
                    return Err(Error::Api {
                        code: Some(SESSION_EXPIRED_CODE),
                        body,
                    });
                }
                result => return result,
            }
        }
    }

    /// Performs an authenticated call and returns the body as-is. Not retried on expiry.
    pub async fn fetch_raw(&self, api: Api, method: &str, extra: &[(&str, String)]) -> Result<Vec<u8>> {
        let (url, query) = self.authenticated_request(api, method, extra)?;
        let response = self.send(url, query).await?;
        Ok(response.body)
    }

    pub async fn camera_list(&mut self) -> Result<Vec<Camera>> {
        let data = self.call(Api::Camera, "List", &[]).await?;
        self.cameras_from(data)
    }

    pub async fn camera_info(&mut self, camera_ids: &[CameraId]) -> Result<Vec<Camera>> {
        let ids = camera_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let data = self
            .call(Api::Camera, "GetInfo", &[("cameraIds", ids)])
            .await?;
        self.cameras_from(data)
    }

    pub async fn camera_snapshot(&self, camera_id: CameraId) -> Result<Vec<u8>> {
        self.fetch_raw(Api::Camera, "GetSnapshot", &[("cameraId", camera_id.to_string())])
            .await
    }

    pub async fn camera_enable(&mut self, camera_ids: &[CameraId]) -> Result<()> {
        self.camera_toggle("Enable", camera_ids).await
    }

    pub async fn camera_disable(&mut self, camera_ids: &[CameraId]) -> Result<()> {
        self.camera_toggle("Disable", camera_ids).await
    }

    async fn camera_toggle(&mut self, method: &str, camera_ids: &[CameraId]) -> Result<()> {
        let ids = camera_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        self.call(
            Api::Camera,
            method,
            &[
                ("version", CAMERA_TOGGLE_VERSION.to_string()),
                ("idList", ids),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn camera_event_motion_enum(&mut self, camera_id: CameraId) -> Result<MotionSetting> {
        let data = self
            .call(Api::CameraEvent, "MotionEnum", &[("camId", camera_id.to_string())])
            .await?;
        let raw: MotionEnumRawResponse = serde_json::from_value(data)?;

        Ok(MotionSetting {
            camera_id,
            source: raw.md_param.source,
        })
    }

    /// Saves motion-detection parameters for a camera and returns the id the station echoed back.
    pub async fn camera_event_md_param_save(
        &mut self,
        camera_id: CameraId,
        params: &[(&str, String)],
    ) -> Result<CameraId> {
        let mut extra = vec![("camId", camera_id.to_string())];
        extra.extend(params.iter().cloned());

        let data = self.call(Api::CameraEvent, "MDParamSave", &extra).await?;
        let raw: MotionParamSaveRawResponse = serde_json::from_value(data)?;
        Ok(raw.cam_id)
    }

    pub async fn home_mode_set_state(&mut self, state: HomeModeState) -> Result<()> {
        self.call(Api::HomeMode, "Switch", &[("on", state.as_str().to_string())])
            .await?;
        Ok(())
    }

    pub async fn home_mode_status(&mut self) -> Result<bool> {
        let data = self.call(Api::HomeMode, "GetInfo", &[]).await?;
        let raw: HomeModeInfoRawResponse = serde_json::from_value(data)?;
        Ok(raw.on)
    }

    /// Stream URL for a camera, authenticated with the current session id.
    pub fn video_stream_url(&self, camera_id: CameraId, format: VideoFormat) -> Result<Url> {
        let (mut url, query) = self.authenticated_request(
            Api::VideoStream,
            "Stream",
            &[
                ("cameraId", camera_id.to_string()),
                ("format", format.to_string()),
            ],
        )?;

        url.query_pairs_mut().extend_pairs(query.iter());
        Ok(url)
    }

    fn cameras_from(&self, data: Value) -> Result<Vec<Camera>> {
        let raw: CameraListRawResponse = serde_json::from_value(data)?;

        raw.cameras
            .into_iter()
            .map(|record| {
                let url = self.video_stream_url(record.id, VideoFormat::default())?;
                Ok(Camera::from_record(record, url))
            })
            .collect()
    }

    fn endpoint(&self, api: Api) -> Result<&Endpoint> {
        self.endpoints
            .as_ref()
            .ok_or_else(|| {
                Error::Config("Endpoints have not been discovered; call initialize() first".to_string())
            })?
            .get(api)
    }

    fn authenticated_request(
        &self,
        api: Api,
        method: &str,
        extra: &[(&str, String)],
    ) -> Result<(Url, Params)> {
        let endpoint = self.endpoint(api)?;
        let sid = self
            .sid
            .as_deref()
            .ok_or_else(|| Error::Config("Not logged in; call initialize() first".to_string()))?;

        let defaults = vec![
            ("_sid".to_string(), sid.to_string()),
            ("api".to_string(), endpoint.name.to_string()),
            ("method".to_string(), method.to_string()),
            ("version".to_string(), endpoint.version.to_string()),
        ];

        Ok((endpoint.url.clone(), merge_params(defaults, extra)))
    }

    async fn send(&self, url: Url, query: Params) -> Result<HttpResponse> {
        if let Some((_, method)) = query.iter().find(|(key, _)| key == "method") {
            debug!(url = %url, method = %method, "GET");
        }

        let response = self.transport.get(url.clone(), query).await?;

        if !response.status.is_success() {
            return Err(Error::Status {
                status: response.status,
                url,
            });
        }

        Ok(response)
    }

    async fn get_json(&self, url: Url, query: Params) -> Result<Value> {
        let response = self.send(url, query).await?;
        parse_envelope(&response.body)
    }
}

fn describe_auth_failure(code: Option<i64>) -> String {
    let reason = match code {
        Some(400) => "no such account or incorrect password",
        Some(401) => "account disabled",
        Some(402) => "permission denied",
        Some(403) => "2-step verification code required",
        Some(404) => "failed to authenticate 2-step verification code",
        _ => "login rejected",
    };

    match code {
        Some(code) => format!("{reason} (code {code})"),
        None => reason.to_string(),
    }
}
