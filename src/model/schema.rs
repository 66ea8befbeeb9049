//! Field schemas
//!
//! A `FieldSchema` describes one resource type: which fields exist, what
//! kind of value each holds, which filter operators each supports, which
//! can be sorted on, and which field is the stable record identifier.

use regex::Regex;
use serde::Serialize;

/// Kind of value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Timestamp,
    Enum,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Number => write!(f, "number"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::Timestamp => write!(f, "timestamp"),
            FieldKind::Enum => write!(f, "enum"),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
            Direction::Desc => write!(f, "desc"),
        }
    }
}

/// Filter operators a field supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// `=`
    pub eq: bool,
    /// `<` and `>`
    pub compare: bool,
    /// `contains`
    pub contains: bool,
    /// `startswith`
    pub startswith: bool,
}

impl Capabilities {
    /// No filtering at all
    pub const NONE: Capabilities = Capabilities {
        eq: false,
        compare: false,
        contains: false,
        startswith: false,
    };

    /// Equality only
    pub const EQ: Capabilities = Capabilities {
        eq: true,
        ..Capabilities::NONE
    };

    /// Equality and ordering comparisons
    pub const ORDERED: Capabilities = Capabilities {
        eq: true,
        compare: true,
        ..Capabilities::NONE
    };

    /// Equality and substring matching
    pub const TEXT: Capabilities = Capabilities {
        eq: true,
        contains: true,
        startswith: true,
        compare: false,
    };

    /// Default capabilities for a value kind
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::String => Self::TEXT,
            FieldKind::Number | FieldKind::Timestamp => Self::ORDERED,
            FieldKind::Boolean | FieldKind::Enum => Self::EQ,
        }
    }

    /// Check if any operator is supported
    pub fn any(&self) -> bool {
        self.eq || self.compare || self.contains || self.startswith
    }
}

/// Definition of a single field
#[derive(Debug, Clone, Serialize)]
pub struct FieldDef {
    /// Field name as it appears in records and queries
    pub name: String,
    /// Value kind
    pub kind: FieldKind,
    /// Supported filter operators
    pub capabilities: Capabilities,
    /// Whether `orderby` may reference this field
    pub sortable: bool,
    /// Whether `contains`/`startswith` ignore case
    pub case_insensitive: bool,
    /// Allowed values for enum fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<String>>,
    /// Part of the default bulk export column set
    #[serde(skip)]
    pub exported: bool,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    /// Create a field of the given kind with its default capabilities
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            capabilities: Capabilities::for_kind(kind),
            sortable: false,
            case_insensitive: false,
            variants: None,
            exported: true,
            description: None,
        }
    }

    /// String field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Numeric field
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    /// Boolean field
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Timestamp field
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    /// Enum field restricted to the given variants
    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        let mut def = Self::new(name, FieldKind::Enum);
        def.variants = Some(variants.iter().map(|v| v.to_string()).collect());
        def
    }

    /// Builder: allow `orderby` on this field
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Builder: case-insensitive `contains`/`startswith`
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Builder: override the supported operators
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Builder: exclude from filtering
    pub fn not_filterable(self) -> Self {
        self.capabilities(Capabilities::NONE)
    }

    /// Builder: leave out of the default export columns
    pub fn hidden(mut self) -> Self {
        self.exported = false;
        self
    }

    /// Builder: set description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

/// Field schema for one resource type
#[derive(Debug, Clone)]
pub struct FieldSchema {
    resource: String,
    fields: Vec<FieldDef>,
    id_field: String,
    id_pattern: Option<Regex>,
    default_order: Vec<(String, Direction)>,
}

impl FieldSchema {
    /// Start building a schema
    pub fn builder(resource: impl Into<String>, id_field: impl Into<String>) -> FieldSchemaBuilder {
        FieldSchemaBuilder {
            resource: resource.into(),
            id_field: id_field.into(),
            fields: Vec::new(),
            id_pattern: None,
            default_order: Vec::new(),
        }
    }

    /// Resource name (used in error messages)
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Name of the stable identifier field
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Kind of the identifier field
    pub fn id_kind(&self) -> FieldKind {
        self.field(&self.id_field)
            .map(|f| f.kind)
            .unwrap_or(FieldKind::String)
    }

    /// Check an identifier against the schema's identifier pattern
    pub fn id_matches_pattern(&self, id: &str) -> bool {
        self.id_pattern
            .as_ref()
            .map(|re| re.is_match(id))
            .unwrap_or(true)
    }

    /// Default ordering when no `orderby` is given
    pub fn default_order(&self) -> &[(String, Direction)] {
        &self.default_order
    }

    /// Default bulk export columns
    pub fn default_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.exported)
            .map(|f| f.name.as_str())
            .collect()
    }
}

/// Builder for `FieldSchema`
#[derive(Debug)]
pub struct FieldSchemaBuilder {
    resource: String,
    id_field: String,
    fields: Vec<FieldDef>,
    id_pattern: Option<Regex>,
    default_order: Vec<(String, Direction)>,
}

impl FieldSchemaBuilder {
    /// Add a field
    pub fn field(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Require identifiers to match a pattern
    ///
    /// An invalid pattern is ignored with a warning; schemas are static
    /// tables, so this only fires during development.
    pub fn id_pattern(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => self.id_pattern = Some(re),
            Err(e) => tracing::warn!(resource = %self.resource, error = %e, "Invalid id pattern"),
        }
        self
    }

    /// Set the default order
    pub fn default_order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.default_order.push((field.into(), direction));
        self
    }

    /// Build the schema
    ///
    /// With no explicit default order, records are ordered by identifier.
    pub fn build(self) -> FieldSchema {
        let default_order = if self.default_order.is_empty() {
            vec![(self.id_field.clone(), Direction::Asc)]
        } else {
            self.default_order
        };

        FieldSchema {
            resource: self.resource,
            fields: self.fields,
            id_field: self.id_field,
            id_pattern: self.id_pattern,
            default_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FieldSchema {
        FieldSchema::builder("devices", "id")
            .field(FieldDef::string("id").sortable())
            .field(FieldDef::string("name").sortable().case_insensitive())
            .field(FieldDef::enumeration("connection_status", &["connected", "disconnected"]))
            .field(FieldDef::number("signal_percent").sortable())
            .field(FieldDef::string("notes").hidden().not_filterable())
            .id_pattern(r"^[0-9A-Fa-f]{8}(-[0-9A-Fa-f]{8}){3}$")
            .build()
    }

    #[test]
    fn test_default_capabilities_by_kind() {
        let schema = schema();
        assert!(schema.field("name").unwrap().capabilities.contains);
        assert!(!schema.field("name").unwrap().capabilities.compare);
        assert!(schema.field("signal_percent").unwrap().capabilities.compare);
        assert!(!schema.field("connection_status").unwrap().capabilities.contains);
        assert!(!schema.field("notes").unwrap().capabilities.any());
    }

    #[test]
    fn test_default_order_is_identifier() {
        let schema = schema();
        assert_eq!(schema.default_order(), &[("id".to_string(), Direction::Asc)]);
    }

    #[test]
    fn test_default_columns_skip_hidden() {
        let schema = schema();
        assert_eq!(
            schema.default_columns(),
            vec!["id", "name", "connection_status", "signal_percent"]
        );
    }

    #[test]
    fn test_id_pattern() {
        let schema = schema();
        assert!(schema.id_matches_pattern("00000000-00000000-00409DFF-FF000001"));
        assert!(!schema.id_matches_pattern("invalid-id-format"));
    }
}
