use std::{collections::HashMap, fmt::Display};

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

pub const SESSION_EXPIRED_CODE: i64 = 105;

/// Session label sent with every login.
pub const AUTH_SESSION: &str = "SurveillanceStation";

pub(crate) const INFO_API: &str = "SYNO.API.Info";
pub(crate) const QUERY_PATH: &str = "query.cgi";

/// Camera `Enable`/`Disable` only answer on this version, whatever discovery reports.
pub const CAMERA_TOGGLE_VERSION: u32 = 9;

/// Logical APIs the client resolves at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Api {
    Auth,
    Camera,
    CameraEvent,
    VideoStream,
    HomeMode,
}

impl Api {
    pub const ALL: [Api; 5] = [
        Api::Auth,
        Api::Camera,
        Api::CameraEvent,
        Api::VideoStream,
        Api::HomeMode,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Api::Auth => "SYNO.API.Auth",
            Api::Camera => "SYNO.SurveillanceStation.Camera",
            Api::CameraEvent => "SYNO.SurveillanceStation.Camera.Event",
            Api::VideoStream => "SYNO.SurveillanceStation.VideoStream",
            Api::HomeMode => "SYNO.SurveillanceStation.HomeMode",
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            Api::Auth => 2,
            Api::Camera | Api::CameraEvent | Api::VideoStream | Api::HomeMode => 1,
        }
    }
}

impl Display for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Api::Auth => write!(f, "auth"),
            Api::Camera => write!(f, "camera"),
            Api::CameraEvent => write!(f, "camera_event"),
            Api::VideoStream => write!(f, "video_stream"),
            Api::HomeMode => write!(f, "home_mode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub api: Api,
    pub name: &'static str,
    pub version: u32,
    pub url: Url,
}

/// Endpoint URLs resolved from a `SYNO.API.Info` query. Never modified after discovery.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    endpoints: HashMap<Api, Endpoint>,
}

impl EndpointTable {
    /// Builds the table from the `data` object of a discovery response, joining
    /// each advertised path onto `base_url`.
    pub fn from_discovery(base_url: &Url, data: &Value) -> Result<Self> {
        let mut endpoints = HashMap::new();

        for api in Api::ALL {
            let path = data
                .get(api.wire_name())
                .and_then(|info| info.get("path"))
                .and_then(|path| path.as_str())
                .ok_or_else(|| {
                    Error::Discovery(format!("No path advertised for {}", api.wire_name()))
                })?;

            endpoints.insert(
                api,
                Endpoint {
                    api,
                    name: api.wire_name(),
                    version: api.version(),
                    url: base_url.join(path)?,
                },
            );
        }

        Ok(Self { endpoints })
    }

    pub fn get(&self, api: Api) -> Result<&Endpoint> {
        self.endpoints
            .get(&api)
            .ok_or_else(|| Error::Discovery(format!("Endpoint {api} was not discovered")))
    }
}

pub type Params = Vec<(String, String)>;

/// Ordered override: keys from `overrides` replace matching defaults in place,
/// new keys are appended in the order given.
pub fn merge_params(mut defaults: Params, overrides: &[(&str, String)]) -> Params {
    for (key, value) in overrides {
        match defaults.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.clone(),
            None => defaults.push((key.to_string(), value.clone())),
        }
    }

    defaults
}

/// Python-style truthiness, which is how the station's `success` flag is meant to be read.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Validates a JSON envelope and returns its `data` member.
pub(crate) fn parse_envelope(body: &[u8]) -> Result<Value> {
    let mut content: Value = serde_json::from_slice(body)?;

    let success = content.get("success").is_some_and(is_truthy);
    if !success {
        let code = content
            .get("error")
            .and_then(|error| error.get("code"))
            .and_then(|code| code.as_i64());

        if code == Some(SESSION_EXPIRED_CODE) {
            return Err(Error::SessionExpired(content));
        }

        return Err(Error::Api {
            code,
            body: content,
        });
    }

    Ok(content
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null))
}
