//! Per-resource field schemas

use crate::model::{Capabilities, Direction, FieldDef, FieldSchema};
use crate::resources::ResourceKind;

/// Device ids: four dash-separated groups of eight hex digits
pub(crate) const DEVICE_ID_PATTERN: &str = r"^[0-9A-Fa-f]{8}(-[0-9A-Fa-f]{8}){3}$";

pub(super) fn build(kind: ResourceKind) -> FieldSchema {
    let name = kind.as_str();
    match kind {
        ResourceKind::Devices => FieldSchema::builder(name, "id")
            .field(FieldDef::string("id").sortable())
            .field(FieldDef::string("name").sortable().case_insensitive())
            .field(FieldDef::string("type").sortable().case_insensitive())
            .field(FieldDef::enumeration("connection_status", &["connected", "disconnected"]).sortable())
            .field(
                FieldDef::enumeration("health_status", &["normal", "warning", "error", "unknown"])
                    .sortable(),
            )
            .field(FieldDef::number("signal_percent").sortable())
            .field(FieldDef::number("signal_strength").sortable())
            .field(FieldDef::string("group").sortable())
            .field(FieldDef::string("mac"))
            .field(FieldDef::string("ip"))
            .field(FieldDef::string("firmware_version").sortable())
            .field(FieldDef::string("serial_number"))
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::string("tags").capabilities(Capabilities {
                contains: true,
                ..Capabilities::NONE
            }))
            .field(FieldDef::boolean("maintenance_mode"))
            .field(FieldDef::timestamp("last_connect").sortable())
            .field(FieldDef::timestamp("last_disconnect").sortable())
            .field(FieldDef::timestamp("last_update").sortable())
            .field(FieldDef::number("customer_id").hidden())
            .id_pattern(DEVICE_ID_PATTERN)
            .build(),

        ResourceKind::Streams => FieldSchema::builder(name, "id")
            .field(FieldDef::string("id").sortable())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::string("device_id").sortable())
            .field(FieldDef::string("type").sortable())
            .field(FieldDef::string("units"))
            .field(FieldDef::string("value").not_filterable())
            .field(FieldDef::timestamp("timestamp").sortable())
            .field(FieldDef::timestamp("server_timestamp").sortable())
            .field(FieldDef::number("history_retention").hidden())
            .build(),

        ResourceKind::StreamHistory => FieldSchema::builder(name, "id")
            .field(FieldDef::string("id").sortable().hidden())
            .field(FieldDef::string("stream_id").hidden())
            .field(FieldDef::timestamp("timestamp").sortable())
            .field(FieldDef::timestamp("server_timestamp").sortable())
            .field(FieldDef::number("value").sortable())
            .field(FieldDef::string("quality").hidden())
            .default_order("timestamp", Direction::Asc)
            .build(),

        ResourceKind::StreamRollups => FieldSchema::builder(name, "timestamp")
            .field(FieldDef::timestamp("timestamp").sortable())
            .field(FieldDef::timestamp("bucket_end"))
            .field(FieldDef::number("value").sortable())
            .field(FieldDef::number("count").sortable())
            .build(),

        ResourceKind::DeviceLogs => FieldSchema::builder(name, "id")
            .field(FieldDef::string("id").sortable().hidden())
            .field(FieldDef::string("device_id").hidden())
            .field(FieldDef::timestamp("timestamp").sortable())
            .field(FieldDef::string("type").sortable())
            .field(FieldDef::enumeration("severity", &["info", "warning", "error", "critical"]).sortable())
            .field(FieldDef::string("message").case_insensitive())
            .default_order("timestamp", Direction::Desc)
            .build(),

        ResourceKind::Events => FieldSchema::builder(name, "id")
            .field(FieldDef::string("id").sortable())
            .field(FieldDef::timestamp("timestamp").sortable())
            .field(FieldDef::string("facility").sortable())
            .field(FieldDef::string("type").sortable())
            .field(FieldDef::string("user").sortable())
            .field(FieldDef::string("ip"))
            .field(FieldDef::string("message").case_insensitive())
            .default_order("timestamp", Direction::Desc)
            .build(),

        ResourceKind::Alerts => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("name").sortable().case_insensitive())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::string("type").sortable())
            .field(FieldDef::enumeration("status", &["enabled", "disabled"]).sortable())
            .field(
                FieldDef::enumeration("severity", &["critical", "high", "medium", "low", "info"])
                    .sortable(),
            )
            .field(FieldDef::string("scope").hidden())
            .field(FieldDef::timestamp("created").sortable())
            .field(FieldDef::timestamp("last_modified").sortable())
            .build(),

        ResourceKind::Monitors => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::enumeration("type", &["http", "tcp", "polling"]).sortable())
            .field(FieldDef::enumeration("status", &["active", "inactive", "disabled"]).sortable())
            .field(FieldDef::string("topic"))
            .field(FieldDef::string("format"))
            .field(FieldDef::timestamp("last_connect").sortable())
            .field(FieldDef::timestamp("last_sent").sortable())
            .build(),

        ResourceKind::MonitorHistory => FieldSchema::builder(name, "id")
            .field(FieldDef::string("id").sortable().hidden())
            .field(FieldDef::number("monitor_id").hidden())
            .field(FieldDef::timestamp("timestamp").sortable())
            .field(FieldDef::string("topic").sortable())
            .field(FieldDef::string("operation"))
            .field(FieldDef::string("data").not_filterable())
            .default_order("timestamp", Direction::Desc)
            .build(),

        ResourceKind::Automations => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("name").sortable().case_insensitive())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::enumeration("status", &["enabled", "disabled"]).sortable())
            .field(FieldDef::number("run_count").sortable())
            .field(FieldDef::timestamp("created").sortable())
            .field(FieldDef::timestamp("last_run").sortable())
            .build(),

        ResourceKind::AutomationRuns => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::number("automation_id").sortable())
            .field(
                FieldDef::enumeration("status", &["pending", "running", "completed", "failed", "cancelled"])
                    .sortable(),
            )
            .field(FieldDef::timestamp("start_time").sortable())
            .field(FieldDef::timestamp("end_time").sortable())
            .field(FieldDef::number("device_count").sortable())
            .default_order("start_time", Direction::Desc)
            .build(),

        ResourceKind::AutomationSchedules => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::number("automation_id").sortable())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::string("schedule"))
            .field(FieldDef::boolean("enabled"))
            .field(FieldDef::timestamp("next_run").sortable())
            .build(),

        ResourceKind::Jobs => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("job_type").sortable())
            .field(
                FieldDef::enumeration(
                    "job_status",
                    &["new", "in_progress", "complete", "failed", "canceled"],
                )
                .sortable(),
            )
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::string("device_id").sortable())
            .field(FieldDef::timestamp("job_submit_time").sortable())
            .field(FieldDef::timestamp("job_completed_time").sortable())
            .field(FieldDef::number("target_count").hidden())
            .default_order("job_submit_time", Direction::Desc)
            .build(),

        ResourceKind::Firmware => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("type").sortable().case_insensitive())
            .field(FieldDef::string("firmware_version").sortable())
            .field(FieldDef::string("vendor_id"))
            .field(FieldDef::boolean("production"))
            .field(FieldDef::boolean("deprecated"))
            .field(FieldDef::enumeration("security_related", &["none", "low", "medium", "high", "critical"]))
            .field(FieldDef::string("information_link").hidden())
            .field(FieldDef::timestamp("created").sortable())
            .build(),

        ResourceKind::FirmwareUpdates => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("device_id").sortable())
            .field(FieldDef::string("version").sortable())
            .field(
                FieldDef::enumeration("status", &["pending", "active", "successful", "failed", "canceled"])
                    .sortable(),
            )
            .field(FieldDef::number("progress").sortable())
            .field(FieldDef::timestamp("created").sortable())
            .field(FieldDef::timestamp("last_update").sortable())
            .default_order("created", Direction::Desc)
            .build(),

        ResourceKind::Groups => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("name").sortable().case_insensitive())
            .field(FieldDef::string("path").sortable())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::number("device_count").sortable())
            .build(),

        ResourceKind::Users => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("username").sortable().case_insensitive())
            .field(FieldDef::string("email").case_insensitive())
            .field(FieldDef::string("first_name").sortable())
            .field(FieldDef::string("last_name").sortable())
            .field(FieldDef::enumeration("role", &["admin", "user", "read_only", "application"]).sortable())
            .field(FieldDef::enumeration("status", &["enabled", "disabled", "locked"]).sortable())
            .field(FieldDef::timestamp("last_login").sortable())
            .build(),

        ResourceKind::Templates => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("name").sortable().case_insensitive())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::string("type").sortable())
            .field(FieldDef::boolean("enabled"))
            .field(FieldDef::number("device_count").sortable())
            .field(FieldDef::timestamp("last_modified").sortable())
            .build(),

        ResourceKind::HealthConfigs => FieldSchema::builder(name, "id")
            .field(FieldDef::number("id").sortable())
            .field(FieldDef::string("type").sortable())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::boolean("enabled"))
            .field(FieldDef::timestamp("last_modified").sortable())
            .build(),

        ResourceKind::FileSets => FieldSchema::builder(name, "name")
            .field(FieldDef::string("name").sortable().case_insensitive())
            .field(FieldDef::string("description").case_insensitive())
            .field(FieldDef::number("file_count").sortable())
            .field(FieldDef::number("size").sortable())
            .field(FieldDef::timestamp("last_modified").sortable())
            .build(),

        ResourceKind::Files => FieldSchema::builder(name, "name")
            .field(FieldDef::string("name").sortable().case_insensitive())
            .field(FieldDef::string("fileset").sortable())
            .field(FieldDef::string("content_type"))
            .field(FieldDef::number("size").sortable())
            .field(FieldDef::string("checksum").hidden())
            .field(FieldDef::timestamp("last_modified").sortable())
            .build(),
    }
}
