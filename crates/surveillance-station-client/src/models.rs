use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

pub type CameraId = u32;

/// Recording-status codes that mean a schedule is actively recording.
pub const RECORDING_STATUSES: [i64; 5] = [
    // Continuous recording schedule
    1,
    // Motion detect recording schedule
    2,
    // Digital input recording schedule
    3,
    // Digital input recording schedule (secondary input)
    4,
    // Manual recording
    5,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: CameraId,
    pub name: String,
    pub is_enabled: bool,
    pub recording_status: i64,
    pub video_stream_url: Url,
}

impl Camera {
    pub(crate) fn from_record(record: CameraRecord, video_stream_url: Url) -> Self {
        Self {
            id: record.id,
            name: record.name,
            is_enabled: record.enabled,
            recording_status: record.rec_status,
            video_stream_url,
        }
    }

    pub fn is_recording(&self) -> bool {
        RECORDING_STATUSES.contains(&self.recording_status)
    }
}

/// A camera as it appears in `List`/`GetInfo` responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct CameraRecord {
    pub id: CameraId,
    pub name: String,
    pub enabled: bool,
    pub rec_status: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CameraListRawResponse {
    pub cameras: Vec<CameraRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MotionDetectionSource {
    Disabled,
    ByCamera,
    BySurveillanceStation,
    Other(i64),
}

impl From<i64> for MotionDetectionSource {
    fn from(value: i64) -> Self {
        match value {
            -1 => MotionDetectionSource::Disabled,
            0 => MotionDetectionSource::ByCamera,
            1 => MotionDetectionSource::BySurveillanceStation,
            other => MotionDetectionSource::Other(other),
        }
    }
}

impl From<MotionDetectionSource> for i64 {
    fn from(value: MotionDetectionSource) -> Self {
        match value {
            MotionDetectionSource::Disabled => -1,
            MotionDetectionSource::ByCamera => 0,
            MotionDetectionSource::BySurveillanceStation => 1,
            MotionDetectionSource::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionSetting {
    pub camera_id: CameraId,
    pub source: MotionDetectionSource,
}

impl MotionSetting {
    pub fn is_enabled(&self) -> bool {
        self.source != MotionDetectionSource::Disabled
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MotionEnumRawResponse {
    #[serde(rename = "MDParam")]
    pub md_param: MotionParamRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MotionParamRecord {
    pub source: MotionDetectionSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub(crate) struct MotionParamSaveRawResponse {
    pub cam_id: CameraId,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HomeModeInfoRawResponse {
    pub on: bool,
}

/// The `on` token of a home-mode `Switch`. The station only accepts the
/// lowercase strings `"true"` and `"false"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeModeState {
    On,
    Off,
}

impl HomeModeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomeModeState::On => "true",
            HomeModeState::Off => "false",
        }
    }
}

impl From<bool> for HomeModeState {
    fn from(on: bool) -> Self {
        if on { HomeModeState::On } else { HomeModeState::Off }
    }
}

impl FromStr for HomeModeState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(HomeModeState::On),
            "false" => Ok(HomeModeState::Off),
            other => Err(Error::Config(format!("Invalid home mode state: {other}"))),
        }
    }
}

impl Display for HomeModeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoFormat {
    #[default]
    Mjpeg,
    Hls,
}

impl Display for VideoFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoFormat::Mjpeg => write!(f, "mjpeg"),
            VideoFormat::Hls => write!(f, "hls"),
        }
    }
}
