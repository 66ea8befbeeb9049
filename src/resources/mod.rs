//! Resource Catalog
//!
//! The fleet resource kinds and their field schemas. Each schema is built
//! on first use and shared read-only for the life of the process.

mod schemas;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::model::FieldSchema;

/// A kind of fleet resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Devices,
    Streams,
    StreamHistory,
    StreamRollups,
    DeviceLogs,
    Events,
    Alerts,
    Monitors,
    MonitorHistory,
    Automations,
    AutomationRuns,
    AutomationSchedules,
    Jobs,
    Firmware,
    FirmwareUpdates,
    Groups,
    Users,
    Templates,
    HealthConfigs,
    FileSets,
    Files,
}

impl ResourceKind {
    /// Every resource kind
    pub const ALL: [ResourceKind; 21] = [
        ResourceKind::Devices,
        ResourceKind::Streams,
        ResourceKind::StreamHistory,
        ResourceKind::StreamRollups,
        ResourceKind::DeviceLogs,
        ResourceKind::Events,
        ResourceKind::Alerts,
        ResourceKind::Monitors,
        ResourceKind::MonitorHistory,
        ResourceKind::Automations,
        ResourceKind::AutomationRuns,
        ResourceKind::AutomationSchedules,
        ResourceKind::Jobs,
        ResourceKind::Firmware,
        ResourceKind::FirmwareUpdates,
        ResourceKind::Groups,
        ResourceKind::Users,
        ResourceKind::Templates,
        ResourceKind::HealthConfigs,
        ResourceKind::FileSets,
        ResourceKind::Files,
    ];

    /// Stable snake_case name (fixture keys, HTTP paths)
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Devices => "devices",
            ResourceKind::Streams => "streams",
            ResourceKind::StreamHistory => "stream_history",
            ResourceKind::StreamRollups => "stream_rollups",
            ResourceKind::DeviceLogs => "device_logs",
            ResourceKind::Events => "events",
            ResourceKind::Alerts => "alerts",
            ResourceKind::Monitors => "monitors",
            ResourceKind::MonitorHistory => "monitor_history",
            ResourceKind::Automations => "automations",
            ResourceKind::AutomationRuns => "automation_runs",
            ResourceKind::AutomationSchedules => "automation_schedules",
            ResourceKind::Jobs => "jobs",
            ResourceKind::Firmware => "firmware",
            ResourceKind::FirmwareUpdates => "firmware_updates",
            ResourceKind::Groups => "groups",
            ResourceKind::Users => "users",
            ResourceKind::Templates => "templates",
            ResourceKind::HealthConfigs => "health_configs",
            ResourceKind::FileSets => "file_sets",
            ResourceKind::Files => "files",
        }
    }

    /// Field schema, built once per process
    pub fn schema(&self) -> &'static FieldSchema {
        static SCHEMAS: OnceLock<Vec<FieldSchema>> = OnceLock::new();
        let schemas = SCHEMAS.get_or_init(|| ResourceKind::ALL.iter().map(|k| schemas::build(*k)).collect());
        // ALL is declared in variant order, so the discriminant indexes it
        &schemas[*self as usize]
    }

    /// Field that ties a scoped record to its parent
    pub fn scope_field(&self) -> Option<&'static str> {
        match self {
            ResourceKind::StreamHistory => Some("stream_id"),
            ResourceKind::DeviceLogs => Some("device_id"),
            ResourceKind::MonitorHistory => Some("monitor_id"),
            ResourceKind::AutomationRuns => Some("automation_id"),
            ResourceKind::Files => Some("fileset"),
            _ => None,
        }
    }

    /// Parent resource of a scoped kind
    pub fn parent(&self) -> Option<ResourceKind> {
        match self {
            ResourceKind::StreamHistory | ResourceKind::StreamRollups => Some(ResourceKind::Streams),
            ResourceKind::DeviceLogs => Some(ResourceKind::Devices),
            ResourceKind::MonitorHistory => Some(ResourceKind::Monitors),
            ResourceKind::AutomationRuns => Some(ResourceKind::Automations),
            ResourceKind::Files => Some(ResourceKind::FileSets),
            _ => None,
        }
    }

    /// Field holding the record time for time-windowed kinds
    pub fn time_field(&self) -> Option<&'static str> {
        match self {
            ResourceKind::StreamHistory | ResourceKind::StreamRollups => Some("timestamp"),
            ResourceKind::DeviceLogs | ResourceKind::Events => Some("timestamp"),
            ResourceKind::MonitorHistory => Some("timestamp"),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let name = match s.as_str() {
            "device" => "devices",
            "stream" => "streams",
            "alert" => "alerts",
            "monitor" => "monitors",
            "automation" => "automations",
            "job" => "jobs",
            "group" => "groups",
            "user" => "users",
            "template" => "templates",
            other => other,
        };
        ResourceKind::ALL
            .iter()
            .find(|k| k.as_str() == name)
            .copied()
            .ok_or_else(|| format!("Unknown resource '{}'", s))
    }
}
