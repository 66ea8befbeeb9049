//! CSV rendering of projected records

use crate::export::{ExportError, ExportResult};
use crate::model::{FieldSchema, Record};
use crate::query::{FilterError, FilterResult};

/// Renders records as CSV with a fixed column list
///
/// Fields containing the delimiter, a quote or a newline are quoted and
/// embedded quotes doubled. Lines end with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFormatter {
    columns: Vec<String>,
}

impl ExportFormatter {
    /// Build a formatter for a comma-separated field list
    ///
    /// A missing or blank list selects the schema's default columns.
    pub fn new(schema: &FieldSchema, fields: Option<&str>) -> FilterResult<Self> {
        let requested: Vec<&str> = fields
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();

        if requested.is_empty() {
            return Ok(Self::with_columns(schema.default_columns()));
        }

        for field in &requested {
            if schema.field(field).is_none() {
                return Err(FilterError::UnknownField {
                    field: field.to_string(),
                    resource: schema.resource().to_string(),
                });
            }
        }

        Ok(Self::with_columns(requested))
    }

    /// Build a formatter with explicit columns, without schema checks
    pub fn with_columns<S: AsRef<str>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    /// Column names in output order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Header line
    pub fn header(&self) -> ExportResult<String> {
        write_line(self.columns.as_slice())
    }

    /// One data line
    pub fn row(&self, record: &Record) -> ExportResult<String> {
        let cells: Vec<String> = self
            .columns
            .iter()
            .map(|column| record.value(column).to_text())
            .collect();
        write_line(cells.as_slice())
    }

    /// Header plus every record
    pub fn format(&self, records: &[Record]) -> ExportResult<String> {
        let mut out = self.header()?;
        for record in records {
            out.push_str(&self.row(record)?);
        }
        Ok(out)
    }
}

fn write_line<S: AsRef<[u8]>>(cells: &[S]) -> ExportResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(cells)?;

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDef;

    fn schema() -> FieldSchema {
        FieldSchema::builder("devices", "id")
            .field(FieldDef::string("id"))
            .field(FieldDef::string("name"))
            .field(FieldDef::enumeration("connection_status", &["connected", "disconnected"]))
            .field(FieldDef::timestamp("last_connect"))
            .field(FieldDef::string("notes").hidden())
            .build()
    }

    #[test]
    fn test_header_echoes_requested_fields() {
        let formatter = ExportFormatter::new(&schema(), Some("id,name,connection_status")).unwrap();
        assert_eq!(formatter.header().unwrap(), "id,name,connection_status\n");

        let formatter = ExportFormatter::new(&schema(), Some(" name , id ")).unwrap();
        assert_eq!(formatter.header().unwrap(), "name,id\n");
    }

    #[test]
    fn test_default_columns() {
        let formatter = ExportFormatter::new(&schema(), None).unwrap();
        assert_eq!(formatter.columns(), &["id", "name", "connection_status", "last_connect"]);
        assert_eq!(ExportFormatter::new(&schema(), Some("")).unwrap(), formatter);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ExportFormatter::new(&schema(), Some("id,colour")).unwrap_err();
        assert!(matches!(err, FilterError::UnknownField { ref field, .. } if field == "colour"));
    }

    #[test]
    fn test_quoting() {
        let formatter = ExportFormatter::new(&schema(), Some("id,name")).unwrap();

        let row = formatter
            .row(&Record::new().with("id", "a,b").with("name", "say \"hi\""))
            .unwrap();
        assert_eq!(row, "\"a,b\",\"say \"\"hi\"\"\"\n");

        let row = formatter
            .row(&Record::new().with("id", "x").with("name", "line1\nline2"))
            .unwrap();
        assert_eq!(row, "x,\"line1\nline2\"\n");
    }

    #[test]
    fn test_format_values() {
        let formatter = ExportFormatter::new(&schema(), Some("id,last_connect,name")).unwrap();
        let records = vec![
            Record::new().with("id", "d1").with_timestamp("last_connect", 1705329342123).with("name", "gw"),
            Record::new().with("id", "d2"),
        ];

        assert_eq!(
            formatter.format(&records).unwrap(),
            "id,last_connect,name\nd1,2024-01-15T14:35:42.123Z,gw\nd2,,\n"
        );
    }
}
