use std::{path::PathBuf, str::FromStr};

use clap::Subcommand;
use tracing::info;

use surveillance_station_client::models::{Camera, CameraId, HomeModeState, MotionSetting};

use crate::{Result, Station};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List cameras with their recording and motion-detection state
    Cameras,
    /// Show one camera, including its stream URL
    Camera { id: CameraId },
    /// Save a snapshot from a camera
    Snapshot {
        id: CameraId,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Enable a camera
    Enable { id: CameraId },
    /// Disable a camera
    Disable { id: CameraId },
    /// Show or change motion detection for a camera
    Motion {
        id: CameraId,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Show home mode, or switch it with `true`/`false`
    HomeMode {
        #[arg(value_parser = HomeModeState::from_str)]
        state: Option<HomeModeState>,
    },
}

pub async fn run(station: &mut Station, command: Command) -> Result<()> {
    match command {
        Command::Cameras => {
            for camera in station.cameras() {
                let motion = station.motion_setting(camera.id).ok();
                println!("{}", describe_camera(camera, motion));
            }
        }
        Command::Camera { id } => {
            let camera = station.camera(id)?;
            let motion = station.motion_setting(id).ok();
            println!("{}", describe_camera(camera, motion));
            println!("stream: {}", camera.video_stream_url);
        }
        Command::Snapshot { id, output } => {
            let image = station.camera_image(id).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(format!("camera-{id}.jpg")));
            tokio::fs::write(&path, &image).await?;
            info!(camera_id = id, bytes = image.len(), path = %path.display(), "Saved snapshot");
        }
        Command::Enable { id } => {
            station.enable_camera(id).await?;
            info!(camera_id = id, "Camera enabled");
        }
        Command::Disable { id } => {
            station.disable_camera(id).await?;
            info!(camera_id = id, "Camera disabled");
        }
        Command::Motion { id, enable, disable } => {
            if enable {
                station.enable_motion_detection(id).await?;
                info!(camera_id = id, "Motion detection enabled");
            } else if disable {
                station.disable_motion_detection(id).await?;
                info!(camera_id = id, "Motion detection disabled");
            } else {
                let setting = station.motion_setting(id)?;
                println!("{}", describe_motion(setting));
            }
        }
        Command::HomeMode { state } => match state {
            Some(state) => {
                station.set_home_mode(state == HomeModeState::On).await?;
                info!(state = %state, "Home mode switched");
            }
            None => {
                let on = station.home_mode_status().await?;
                println!("home mode: {}", if on { "on" } else { "off" });
            }
        },
    }

    Ok(())
}

fn describe_camera(camera: &Camera, motion: Option<&MotionSetting>) -> String {
    let motion = motion
        .map(|m| if m.is_enabled() { "on" } else { "off" })
        .unwrap_or("unknown");

    format!(
        "{:>4}  {:<24}  {:<8}  {:<13}  motion {}",
        camera.id,
        camera.name,
        if camera.is_enabled { "enabled" } else { "disabled" },
        if camera.is_recording() { "recording" } else { "not recording" },
        motion,
    )
}

fn describe_motion(setting: &MotionSetting) -> String {
    format!(
        "camera {}: motion detection {} (source {})",
        setting.camera_id,
        if setting.is_enabled() { "on" } else { "off" },
        i64::from(setting.source),
    )
}
