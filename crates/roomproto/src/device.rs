//! Device metadata: commands, ports and roles.

use serde::{Deserialize, Serialize};

/// Well-known device roles.
pub mod roles {
    pub const AUDIO_OUT: &str = "AudioOut";
    pub const VIDEO_OUT: &str = "VideoOut";
    pub const DSP: &str = "DSP";
    pub const VIDEO_SWITCHER: &str = "VideoSwitcher";
    pub const MICROPHONE: &str = "Microphone";
    pub const GATEWAY: &str = "Gateway";
}

/// A command a device understands.
///
/// `endpoint` is a path template. `:address` is replaced with the device's
/// network address, and every other `:name` placeholder with the action
/// parameter of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    /// Base URL of the service that drives this class of device.
    pub microservice: String,
    pub endpoint: String,
}

impl Command {
    pub fn new(
        name: impl Into<String>,
        microservice: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            microservice: microservice.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// A physical connection between two devices.
///
/// The signal flows from `source_device` into `destination_device`.
/// `host_device` is the device that owns the port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub source_device: String,
    pub destination_device: String,
    #[serde(default)]
    pub host_device: String,
}

impl Port {
    pub fn new(
        id: impl Into<String>,
        source_device: impl Into<String>,
        destination_device: impl Into<String>,
    ) -> Self {
        let destination_device = destination_device.into();
        Self {
            id: id.into(),
            source_device: source_device.into(),
            host_device: destination_device.clone(),
            destination_device,
        }
    }

    pub fn hosted_by(mut self, host: impl Into<String>) -> Self {
        self.host_device = host.into();
        self
    }
}

/// Device record as returned by the device store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Sinks: displays, speakers, anything a user looks at or listens to.
    #[serde(default)]
    pub output: bool,
    /// Sources: laptops, media players, cameras.
    #[serde(default)]
    pub input: bool,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn in_room(mut self, building: impl Into<String>, room: impl Into<String>) -> Self {
        self.building = building.into();
        self.room = room.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn as_output(mut self) -> Self {
        self.output = true;
        self
    }

    pub fn as_input(mut self) -> Self {
        self.input = true;
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Look up a command by name, ignoring case.
    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.command(name).is_some()
    }

    /// `building-room-name`, the identifier used in published events.
    pub fn full_name(&self) -> String {
        if self.building.is_empty() && self.room.is_empty() {
            return self.name.clone();
        }
        format!("{}-{}-{}", self.building, self.room, self.name)
    }

    /// Whether this device matches a user-supplied name (id or name, any case).
    pub fn matches(&self, name: &str) -> bool {
        self.id.eq_ignore_ascii_case(name) || self.name.eq_ignore_ascii_case(name)
    }
}
