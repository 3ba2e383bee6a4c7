use std::collections::BTreeMap;

use tracing::{debug, info};

use surveillance_station_client::{
    SessionClient,
    config::StationConfig,
    models::{Camera, CameraId, HomeModeState, MotionDetectionSource, MotionSetting},
};

use crate::{Error, Result};

/// Cached view of a station's cameras and their motion-detection settings.
///
/// Mutating calls are forwarded to the station without touching the cache;
/// call [`refresh`](Self::refresh) to observe their effect.
pub struct Station {
    client: SessionClient,
    cameras: BTreeMap<CameraId, Camera>,
    motion_settings: BTreeMap<CameraId, MotionSetting>,
}

impl Station {
    pub async fn connect(config: StationConfig) -> Result<Self> {
        let client = SessionClient::connect(config).await?;
        Self::new(client).await
    }

    /// Wraps an initialized client and loads the first snapshot.
    pub async fn new(client: SessionClient) -> Result<Self> {
        let mut station = Self {
            client,
            cameras: BTreeMap::new(),
            motion_settings: BTreeMap::new(),
        };

        station.refresh().await?;
        Ok(station)
    }

    /// Reloads the camera list and one motion setting per camera. The cache
    /// is only replaced once every request has succeeded.
    pub async fn refresh(&mut self) -> Result<()> {
        let cameras: BTreeMap<CameraId, Camera> = self
            .client
            .camera_list()
            .await?
            .into_iter()
            .map(|camera| (camera.id, camera))
            .collect();

        let mut motion_settings = BTreeMap::new();
        for &camera_id in cameras.keys() {
            let setting = self.client.camera_event_motion_enum(camera_id).await?;
            motion_settings.insert(camera_id, setting);
        }

        info!(cameras = cameras.len(), "Refreshed Surveillance Station cameras");

        self.cameras = cameras;
        self.motion_settings = motion_settings;
        Ok(())
    }

    pub fn cameras(&self) -> Vec<&Camera> {
        self.cameras.values().collect()
    }

    pub fn camera(&self, camera_id: CameraId) -> Result<&Camera> {
        self.cameras
            .get(&camera_id)
            .ok_or(Error::NotFound(camera_id))
    }

    pub async fn camera_image(&self, camera_id: CameraId) -> Result<Vec<u8>> {
        Ok(self.client.camera_snapshot(camera_id).await?)
    }

    /// `Ok` once the station reports `success: true`. The cache is left as is
    /// until the next `refresh`.
    pub async fn enable_camera(&mut self, camera_id: CameraId) -> Result<()> {
        Ok(self.client.camera_enable(&[camera_id]).await?)
    }

    /// `Ok` once the station reports `success: true`. The cache is left as is
    /// until the next `refresh`.
    pub async fn disable_camera(&mut self, camera_id: CameraId) -> Result<()> {
        Ok(self.client.camera_disable(&[camera_id]).await?)
    }

    pub fn motion_setting(&self, camera_id: CameraId) -> Result<&MotionSetting> {
        self.motion_settings
            .get(&camera_id)
            .ok_or(Error::NotFound(camera_id))
    }

    pub async fn enable_motion_detection(&mut self, camera_id: CameraId) -> Result<()> {
        self.save_motion_source(camera_id, MotionDetectionSource::BySurveillanceStation)
            .await
    }

    pub async fn disable_motion_detection(&mut self, camera_id: CameraId) -> Result<()> {
        self.save_motion_source(camera_id, MotionDetectionSource::Disabled)
            .await
    }

    async fn save_motion_source(
        &mut self,
        camera_id: CameraId,
        source: MotionDetectionSource,
    ) -> Result<()> {
        let source = i64::from(source);
        let saved = self
            .client
            .camera_event_md_param_save(camera_id, &[("source", source.to_string())])
            .await?;

        debug!(camera_id = saved, source, "Saved motion detection source");
        Ok(())
    }

    /// `Ok` once the station reports `success: true`.
    pub async fn set_home_mode(&mut self, on: bool) -> Result<()> {
        Ok(self.client.home_mode_set_state(HomeModeState::from(on)).await?)
    }

    pub async fn home_mode_status(&mut self) -> Result<bool> {
        Ok(self.client.home_mode_status().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use mockall::mock;
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use tokio_test::assert_err;
    use url::Url;

    use surveillance_station_client::transport::{HttpResponse, Transport};

    use super::*;

    type Params = Vec<(String, String)>;
    type Calls = Arc<Mutex<Vec<Params>>>;

    mock! {
        Nas {}
        #[async_trait]
        impl Transport for Nas {
            async fn get(
                &self,
                url: Url,
                query: Vec<(String, String)>,
            ) -> surveillance_station_client::Result<HttpResponse>;
        }
    }

    fn param<'a>(query: &'a Params, key: &str) -> Option<&'a str> {
        query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn ok(data: Value) -> surveillance_station_client::Result<HttpResponse> {
        Ok(HttpResponse {
            status: StatusCode::OK,
            body: json!({ "success": true, "data": data }).to_string().into_bytes(),
        })
    }

    fn fail(code: i64) -> surveillance_station_client::Result<HttpResponse> {
        Ok(HttpResponse {
            status: StatusCode::OK,
            body: json!({ "success": false, "error": { "code": code } })
                .to_string()
                .into_bytes(),
        })
    }

    fn discovery_data() -> Value {
        json!({
            "SYNO.API.Auth": { "path": "auth.cgi" },
            "SYNO.SurveillanceStation.Camera": { "path": "entry.cgi" },
            "SYNO.SurveillanceStation.Camera.Event": { "path": "entry.cgi" },
            "SYNO.SurveillanceStation.VideoStream": { "path": "SurveillanceStation/videoStreaming.cgi" },
            "SYNO.SurveillanceStation.HomeMode": { "path": "entry.cgi" }
        })
    }

    fn two_cameras() -> Value {
        json!({
            "cameras": [
                { "id": 1, "name": "Laundry Room Cam", "enabled": true, "recStatus": 2 },
                { "id": 2, "name": "Family Room Cam", "enabled": false, "recStatus": 1 }
            ]
        })
    }

    /// Serves discovery and login (sid `abc123`) and passes the rest to `handler`.
    fn mock_nas<F>(mut handler: F) -> (MockNas, Calls)
    where
        F: FnMut(&str, &Params) -> surveillance_station_client::Result<HttpResponse>
            + Send
            + 'static,
    {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        let mut nas = MockNas::new();
        nas.expect_get().returning(move |_url, query| {
            recorded.lock().unwrap().push(query.clone());

            match param(&query, "method") {
                Some("Query") => ok(discovery_data()),
                Some("Login") => ok(json!({ "sid": "abc123" })),
                Some(method) => handler(method, &query),
                None => panic!("request without a method"),
            }
        });

        (nas, calls)
    }

    /// Answers `List` from `cameras` and `MotionEnum` with source `-1` for odd
    /// ids and `1` for even ones.
    fn camera_handler(
        cameras: Arc<Mutex<Value>>,
    ) -> impl FnMut(&str, &Params) -> surveillance_station_client::Result<HttpResponse> + Send + 'static
    {
        move |method: &str, query: &Params| match method {
            "List" => ok(cameras.lock().unwrap().clone()),
            "MotionEnum" => {
                let id: i64 = param(query, "camId").unwrap().parse().unwrap();
                let source = if id % 2 == 1 { -1 } else { 1 };
                ok(json!({ "MDParam": { "source": source } }))
            }
            _ => ok(Value::Null),
        }
    }

    async fn station(nas: MockNas) -> Station {
        let config = StationConfig {
            url: "http://192.168.1.8:5000".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            timeout: Duration::from_secs(10),
            verify_ssl: true,
        };

        let mut client = SessionClient::with_transport(config, nas).unwrap();
        client.initialize().await.unwrap();
        Station::new(client).await.unwrap()
    }

    fn last_call(calls: &Calls) -> Params {
        calls.lock().unwrap().last().cloned().expect("at least one call")
    }

    #[tokio::test]
    async fn test_refresh_loads_two_cameras() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let (nas, _calls) = mock_nas(camera_handler(cameras));
        let station = station(nas).await;

        let listed = station.cameras();
        assert_eq!(listed.len(), 2);

        let laundry = listed[0];
        assert_eq!(laundry.id, 1);
        assert_eq!(laundry.name, "Laundry Room Cam");
        assert!(laundry.is_enabled);
        assert!(laundry.is_recording());

        let family = listed[1];
        assert_eq!(family.id, 2);
        assert_eq!(family.name, "Family Room Cam");
        assert!(!family.is_enabled);
        assert!(family.is_recording());

        for camera in listed {
            let camera_id = camera
                .video_stream_url
                .query_pairs()
                .find(|(k, _)| k == "cameraId")
                .map(|(_, v)| v.into_owned());
            assert_eq!(camera_id, Some(camera.id.to_string()));
        }
    }

    #[tokio::test]
    async fn test_refresh_loads_one_motion_setting_per_camera() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let (nas, calls) = mock_nas(camera_handler(cameras));
        let station = station(nas).await;

        let motion_enums = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|q| param(q, "method") == Some("MotionEnum"))
            .count();
        assert_eq!(motion_enums, 2);

        assert!(!station.motion_setting(1).unwrap().is_enabled());
        assert!(station.motion_setting(2).unwrap().is_enabled());
        assert!(matches!(station.motion_setting(3), Err(Error::NotFound(3))));
    }

    #[tokio::test]
    async fn test_refresh_replaces_cache_wholesale() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let (nas, _calls) = mock_nas(camera_handler(cameras.clone()));
        let mut station = station(nas).await;

        *cameras.lock().unwrap() = json!({
            "cameras": [
                { "id": 2, "name": "Family Room Cam", "enabled": true, "recStatus": 0 },
                { "id": 4, "name": "Porch Cam", "enabled": true, "recStatus": 5 }
            ]
        });
        station.refresh().await.unwrap();

        let ids: Vec<CameraId> = station.cameras().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 4]);
        assert!(station.camera(2).unwrap().is_enabled);
        assert!(!station.camera(2).unwrap().is_recording());

        assert!(matches!(station.camera(1), Err(Error::NotFound(1))));
        assert!(matches!(station.motion_setting(1), Err(Error::NotFound(1))));
        assert!(station.motion_setting(4).unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_cache() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let fail_motion = Arc::new(Mutex::new(false));
        let mut inner = camera_handler(cameras.clone());
        let failing = fail_motion.clone();
        let (nas, _calls) = mock_nas(move |method, query| {
            if method == "MotionEnum" && *failing.lock().unwrap() {
                return fail(400);
            }
            inner(method, query)
        });
        let mut station = station(nas).await;

        *cameras.lock().unwrap() = json!({
            "cameras": [{ "id": 9, "name": "Attic Cam", "enabled": true, "recStatus": 1 }]
        });
        *fail_motion.lock().unwrap() = true;

        let err = assert_err!(station.refresh().await);
        assert!(matches!(err, Error::Client(e) if e.api_code() == Some(400)));

        let ids: Vec<CameraId> = station.cameras().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(station.motion_setting(1).is_ok());
        assert!(matches!(station.camera(9), Err(Error::NotFound(9))));
    }

    #[tokio::test]
    async fn test_unknown_camera_is_not_found() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let (nas, _calls) = mock_nas(camera_handler(cameras));
        let station = station(nas).await;

        assert!(matches!(station.camera(999), Err(Error::NotFound(999))));
    }

    #[tokio::test]
    async fn test_motion_detection_toggles_send_source() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let mut inner = camera_handler(cameras);
        let (nas, calls) = mock_nas(move |method, query| match method {
            "MDParamSave" => ok(json!({ "camId": 1 })),
            _ => inner(method, query),
        });
        let mut station = station(nas).await;

        station.enable_motion_detection(1).await.unwrap();
        let save = last_call(&calls);
        assert_eq!(param(&save, "method"), Some("MDParamSave"));
        assert_eq!(param(&save, "camId"), Some("1"));
        assert_eq!(param(&save, "source"), Some("1"));

        station.disable_motion_detection(1).await.unwrap();
        assert_eq!(param(&last_call(&calls), "source"), Some("-1"));

        // Not reflected until the next refresh.
        assert!(!station.motion_setting(1).unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_camera_toggles_do_not_touch_cache() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let (nas, calls) = mock_nas(camera_handler(cameras));
        let mut station = station(nas).await;

        station.enable_camera(2).await.unwrap();
        let enable = last_call(&calls);
        assert_eq!(param(&enable, "method"), Some("Enable"));
        assert_eq!(param(&enable, "idList"), Some("2"));
        assert_eq!(param(&enable, "version"), Some("9"));

        station.disable_camera(1).await.unwrap();
        assert_eq!(param(&last_call(&calls), "method"), Some("Disable"));

        assert!(!station.camera(2).unwrap().is_enabled);
        assert!(station.camera(1).unwrap().is_enabled);
    }

    #[tokio::test]
    async fn test_home_mode() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let mut inner = camera_handler(cameras);
        let (nas, calls) = mock_nas(move |method, query| match method {
            "GetInfo" => ok(json!({ "on": false })),
            _ => inner(method, query),
        });
        let mut station = station(nas).await;

        station.set_home_mode(true).await.unwrap();
        assert_eq!(param(&last_call(&calls), "on"), Some("true"));

        station.set_home_mode(false).await.unwrap();
        let switch = last_call(&calls);
        assert_eq!(param(&switch, "method"), Some("Switch"));
        assert_eq!(param(&switch, "on"), Some("false"));

        assert!(!station.home_mode_status().await.unwrap());
    }

    #[tokio::test]
    async fn test_camera_image_is_raw() {
        let cameras = Arc::new(Mutex::new(two_cameras()));
        let mut inner = camera_handler(cameras);
        let (nas, _calls) = mock_nas(move |method, query| match method {
            "GetSnapshot" => Ok(HttpResponse {
                status: StatusCode::OK,
                body: b"\xff\xd8jpeg".to_vec(),
            }),
            _ => inner(method, query),
        });
        let station = station(nas).await;

        assert_eq!(station.camera_image(1).await.unwrap(), b"\xff\xd8jpeg".to_vec());
    }
}
