//! Operation table
//!
//! Every named operation and the behaviour it dispatches to.

use serde::Serialize;

use crate::resources::ResourceKind;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Paged JSON or full CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Page,
    Bulk,
}

/// What an operation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Filtered, ordered listing of a resource
    Collection {
        resource: ResourceKind,
        mode: Mode,
        /// Argument naming the parent record of a scoped resource
        scope_arg: Option<&'static str>,
        /// Default lookback for time-windowed listings
        lookback_ms: Option<i64>,
    },
    /// One record by identifier
    Get {
        resource: ResourceKind,
        id_arg: &'static str,
        /// Identifier is written `parent/id`
        qualified: bool,
    },
    /// Time-bucketed aggregation of a stream's history
    Rollup { mode: Mode },
    /// Device id lookup by name fragment
    FindDeviceByName,
    SyntaxRules,
    SyntaxHelp,
    FieldList,
    QueryExamples,
    ValidateQuery,
    ApiInfo,
}

/// A named operation
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub name: &'static str,
    pub family: &'static str,
    pub summary: &'static str,
    pub kind: OperationKind,
}

/// Default lookback for stream rollups
pub const ROLLUP_LOOKBACK_MS: i64 = WEEK_MS;

const fn list(resource: ResourceKind) -> OperationKind {
    OperationKind::Collection {
        resource,
        mode: Mode::Page,
        scope_arg: None,
        lookback_ms: None,
    }
}

const fn bulk(resource: ResourceKind) -> OperationKind {
    OperationKind::Collection {
        resource,
        mode: Mode::Bulk,
        scope_arg: None,
        lookback_ms: None,
    }
}

const fn history(resource: ResourceKind, mode: Mode, scope_arg: &'static str, lookback_ms: i64) -> OperationKind {
    OperationKind::Collection {
        resource,
        mode,
        scope_arg: Some(scope_arg),
        lookback_ms: Some(lookback_ms),
    }
}

const fn windowed(resource: ResourceKind, mode: Mode, lookback_ms: i64) -> OperationKind {
    OperationKind::Collection {
        resource,
        mode,
        scope_arg: None,
        lookback_ms: Some(lookback_ms),
    }
}

const fn get(resource: ResourceKind, id_arg: &'static str) -> OperationKind {
    OperationKind::Get {
        resource,
        id_arg,
        qualified: false,
    }
}

const fn op(name: &'static str, family: &'static str, summary: &'static str, kind: OperationKind) -> OperationSpec {
    OperationSpec {
        name,
        family,
        summary,
        kind,
    }
}

use ResourceKind as R;

static OPERATIONS: &[OperationSpec] = &[
    // Query helpers
    op("get_query_syntax_rules", "query", "Filter language rules", OperationKind::SyntaxRules),
    op("get_query_syntax_help", "query", "Filter language quick reference", OperationKind::SyntaxHelp),
    op("get_device_fields", "query", "Filterable and sortable fields", OperationKind::FieldList),
    op("get_query_examples", "query", "Example queries by category", OperationKind::QueryExamples),
    op("validate_query_syntax", "query", "Compile a query without running it", OperationKind::ValidateQuery),
    op("get_api_info", "query", "Service and operation information", OperationKind::ApiInfo),
    // Devices
    op("list_devices", "devices", "List devices", list(R::Devices)),
    op("list_devices_bulk", "devices", "Export devices as CSV", bulk(R::Devices)),
    op("find_device_id_by_name", "devices", "Find device ids by name fragment", OperationKind::FindDeviceByName),
    op("get_device", "devices", "Get one device", get(R::Devices, "device_id")),
    op(
        "get_device_event_logs",
        "devices",
        "Event log entries of one device",
        history(R::DeviceLogs, Mode::Page, "device_id", HOUR_MS),
    ),
    // Streams
    op("list_streams", "streams", "List data streams", list(R::Streams)),
    op("list_streams_bulk", "streams", "Export data streams as CSV", bulk(R::Streams)),
    op("get_stream", "streams", "Get one data stream", get(R::Streams, "stream_id")),
    op(
        "get_stream_history",
        "streams",
        "Samples of one stream",
        history(R::StreamHistory, Mode::Page, "stream_id", DAY_MS),
    ),
    op(
        "get_stream_history_bulk",
        "streams",
        "Export samples of one stream as CSV",
        history(R::StreamHistory, Mode::Bulk, "stream_id", DAY_MS),
    ),
    op("get_stream_rollups", "streams", "Time-bucketed aggregates of one stream", OperationKind::Rollup { mode: Mode::Page }),
    op(
        "get_stream_rollups_bulk",
        "streams",
        "Export time-bucketed aggregates of one stream as CSV",
        OperationKind::Rollup { mode: Mode::Bulk },
    ),
    // Groups
    op("list_groups", "groups", "List device groups", list(R::Groups)),
    // Alerts and monitors
    op("list_alerts", "alerts", "List alert definitions", list(R::Alerts)),
    op("get_alert", "alerts", "Get one alert definition", get(R::Alerts, "alert_id")),
    op("list_monitors", "monitors", "List monitors", list(R::Monitors)),
    op("get_monitor", "monitors", "Get one monitor", get(R::Monitors, "monitor_id")),
    op(
        "get_monitor_history",
        "monitors",
        "Delivery history of one monitor",
        history(R::MonitorHistory, Mode::Page, "monitor_id", DAY_MS),
    ),
    // Automations
    op("list_automations", "automations", "List automations", list(R::Automations)),
    op("get_automation", "automations", "Get one automation", get(R::Automations, "automation_id")),
    op("list_automation_runs", "automations", "List automation runs", list(R::AutomationRuns)),
    op("get_automation_run", "automations", "Get one automation run", get(R::AutomationRuns, "run_id")),
    op("list_automation_schedules", "automations", "List automation schedules", list(R::AutomationSchedules)),
    op(
        "get_automation_schedule",
        "automations",
        "Get one automation schedule",
        get(R::AutomationSchedules, "schedule_id"),
    ),
    // Jobs and firmware
    op("list_jobs", "jobs", "List jobs", list(R::Jobs)),
    op("list_jobs_bulk", "jobs", "Export jobs as CSV", bulk(R::Jobs)),
    op("get_job", "jobs", "Get one job", get(R::Jobs, "job_id")),
    op("list_firmware", "firmware", "List firmware images", list(R::Firmware)),
    op("get_firmware", "firmware", "Get one firmware image", get(R::Firmware, "firmware_id")),
    op("list_firmware_updates", "firmware", "List firmware updates", list(R::FirmwareUpdates)),
    op("get_firmware_update", "firmware", "Get one firmware update", get(R::FirmwareUpdates, "update_id")),
    // Configuration and health
    op("list_templates", "configuration", "List configuration templates", list(R::Templates)),
    op("get_template", "configuration", "Get one configuration template", get(R::Templates, "config_id")),
    op("list_health_configs", "configuration", "List health configurations", list(R::HealthConfigs)),
    op(
        "get_health_config",
        "configuration",
        "Get one health configuration",
        get(R::HealthConfigs, "health_config_id"),
    ),
    // Account
    op("list_users", "account", "List users", list(R::Users)),
    op("get_user", "account", "Get one user", get(R::Users, "user_id")),
    op("list_events", "account", "List audit events", windowed(R::Events, Mode::Page, HOUR_MS)),
    op("list_events_bulk", "account", "Export audit events as CSV", windowed(R::Events, Mode::Bulk, HOUR_MS)),
    op("list_file_sets", "account", "List file sets", list(R::FileSets)),
    op(
        "list_files_in_a_set",
        "account",
        "List files in one file set",
        OperationKind::Collection {
            resource: R::Files,
            mode: Mode::Page,
            scope_arg: Some("fileset_name"),
            lookback_ms: None,
        },
    ),
    op(
        "get_file",
        "account",
        "Get one file, named `set/file`",
        OperationKind::Get {
            resource: R::Files,
            id_arg: "file_name",
            qualified: true,
        },
    ),
];

/// Every operation, in catalog order
pub fn operations() -> &'static [OperationSpec] {
    OPERATIONS
}

/// Look up an operation by name
pub fn lookup(name: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|spec| spec.name == name)
}

impl OperationSpec {
    /// Argument names the operation reads
    pub fn parameters(&self) -> Vec<&'static str> {
        match self.kind {
            OperationKind::Collection {
                resource,
                mode,
                scope_arg,
                lookback_ms,
            } => {
                let mut params: Vec<&'static str> = scope_arg.into_iter().collect();
                params.extend(["query", "orderby"]);
                if resource.time_field().is_some() {
                    params.push("order");
                }
                if lookback_ms.is_some() {
                    params.extend(["start_time", "end_time"]);
                }
                match mode {
                    Mode::Page => params.extend(["size", "cursor"]),
                    Mode::Bulk => params.push("fields"),
                }
                params
            }
            OperationKind::Get { id_arg, .. } => vec![id_arg],
            OperationKind::Rollup { mode } => {
                let mut params = vec![
                    "stream_id",
                    "interval",
                    "method",
                    "start_time",
                    "end_time",
                    "query",
                    "orderby",
                    "order",
                ];
                match mode {
                    Mode::Page => params.extend(["size", "cursor"]),
                    Mode::Bulk => params.push("fields"),
                }
                params
            }
            OperationKind::FindDeviceByName => vec!["device_search", "size", "cursor"],
            OperationKind::FieldList => vec!["resource"],
            OperationKind::QueryExamples => vec!["query_type"],
            OperationKind::ValidateQuery => vec!["query", "resource"],
            OperationKind::ApiInfo => vec!["endpoint"],
            OperationKind::SyntaxRules | OperationKind::SyntaxHelp => Vec::new(),
        }
    }

    /// Resource the operation reads, if any
    pub fn resource(&self) -> Option<ResourceKind> {
        match self.kind {
            OperationKind::Collection { resource, .. } | OperationKind::Get { resource, .. } => Some(resource),
            OperationKind::Rollup { .. } => Some(ResourceKind::StreamRollups),
            OperationKind::FindDeviceByName => Some(ResourceKind::Devices),
            _ => None,
        }
    }

    /// Check whether the operation produces CSV
    pub fn is_bulk(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::Collection { mode: Mode::Bulk, .. } | OperationKind::Rollup { mode: Mode::Bulk }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = operations().iter().map(|s| s.name).collect();
        assert_eq!(names.len(), operations().len());
    }

    #[test]
    fn test_scope_args_match_parents() {
        for spec in operations() {
            if let OperationKind::Collection {
                resource,
                scope_arg: Some(_),
                ..
            } = spec.kind
            {
                assert!(resource.parent().is_some(), "{}", spec.name);
                assert!(resource.scope_field().is_some(), "{}", spec.name);
            }
            if let OperationKind::Collection {
                resource,
                lookback_ms: Some(_),
                ..
            } = spec.kind
            {
                assert!(resource.time_field().is_some(), "{}", spec.name);
            }
        }
    }

    #[test]
    fn test_lookup_and_parameters() {
        let spec = lookup("get_stream_history_bulk").unwrap();
        assert!(spec.is_bulk());
        assert_eq!(
            spec.parameters(),
            vec!["stream_id", "query", "orderby", "order", "start_time", "end_time", "fields"]
        );

        let spec = lookup("get_user").unwrap();
        assert_eq!(spec.parameters(), vec!["user_id"]);
        assert_eq!(spec.resource(), Some(ResourceKind::Users));

        assert!(lookup("list_gizmos").is_none());
    }
}
