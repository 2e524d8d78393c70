//! Shared fakes and fixtures for conductor integration tests.
//!
//! `FakeClient` answers device requests in-process and records when each one
//! started and finished. `RecordingPublisher` keeps every published event.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use conductor::{DeviceClient, DeviceRequest, DeviceResponse, EventPublisher, TransportError};
use roomproto::{roles, Command, Device, Event, Port};
use tokio::time::Instant;

pub const DRIVER: &str = "http://driver:8000";

#[derive(Debug, Clone)]
pub struct Call {
    pub device: String,
    pub url: String,
    pub started: Instant,
    pub finished: Instant,
}

/// How the fake answers a given device.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Unreachable,
    Hang,
}

pub struct FakeClient {
    delay: Duration,
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(10))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, device: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(device.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// URLs sent to one device, in the order they completed.
    pub fn urls_for(&self, device: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.device == device)
            .map(|c| c.url)
            .collect()
    }
}

#[async_trait]
impl DeviceClient for FakeClient {
    async fn send(&self, request: &DeviceRequest) -> Result<DeviceResponse, TransportError> {
        let started = Instant::now();
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&request.device)
            .cloned()
            .unwrap_or_else(|| Reply::Status(200, r#"{"ok": true}"#.to_string()));

        match reply {
            Reply::Hang => tokio::time::sleep(Duration::from_secs(3600)).await,
            _ => tokio::time::sleep(self.delay).await,
        }

        self.calls.lock().unwrap().push(Call {
            device: request.device.clone(),
            url: request.url(),
            started,
            finished: Instant::now(),
        });

        match reply {
            Reply::Status(status, body) => Ok(DeviceResponse { status, body }),
            Reply::Unreachable | Reply::Hang => Err(TransportError::Request {
                url: request.url(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<Event>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<Event> {
        self.events().into_iter().filter(|e| e.is_error()).collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn command(name: &str, endpoint: &str) -> Command {
    Command::new(name, DRIVER, endpoint)
}

pub fn display(id: &str) -> Device {
    Device::new(id)
        .with_address(format!("{}.local", id.to_lowercase()))
        .in_room("ITB", "1101")
        .with_role(roles::VIDEO_OUT)
        .with_role(roles::AUDIO_OUT)
        .as_output()
        .with_command(command("PowerOn", "/:address/power/on"))
        .with_command(command("Standby", "/:address/power/standby"))
        .with_command(command("BlankDisplay", "/:address/display/blank"))
        .with_command(command("UnblankDisplay", "/:address/display/unblank"))
        .with_command(command("Mute", "/:address/mute"))
        .with_command(command("UnMute", "/:address/unmute"))
        .with_command(command("SetVolume", "/:address/volume/:level"))
        .with_command(command("ChangeInput", "/:address/input/:port"))
}

pub fn source(id: &str) -> Device {
    Device::new(id).in_room("ITB", "1101").as_input()
}

/// D1 and D2 with the laptop wired into both.
pub fn room_devices() -> Vec<Device> {
    vec![
        display("D1").with_port(Port::new("HDMI1", "laptop", "D1")),
        display("D2").with_port(Port::new("HDMI2", "laptop", "D2")),
        source("laptop"),
    ]
}
