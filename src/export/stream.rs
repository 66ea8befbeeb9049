//! Backpressured CSV streaming
//!
//! A producer task renders one line at a time into a bounded channel.
//! When the consumer stops reading, the producer is parked on `send`; when
//! the consumer goes away, the next `send` fails and the producer exits.

use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;

use crate::export::{ExportFormatter, ExportResult};
use crate::model::Record;

/// Receiving half of a streamed export
#[derive(Debug)]
pub struct ExportStream {
    rx: mpsc::Receiver<ExportResult<String>>,
}

impl ExportStream {
    /// Spawn the producer; at most `buffer` rendered lines are in flight
    pub fn spawn(formatter: ExportFormatter, records: Vec<Record>, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));

        tokio::spawn(async move {
            let header = formatter.header();
            let failed = header.is_err();
            if tx.send(header).await.is_err() || failed {
                return;
            }

            for (index, record) in records.iter().enumerate() {
                let line = formatter.row(record);
                let failed = line.is_err();
                if tx.send(line).await.is_err() {
                    tracing::debug!(rows_sent = index, "Export consumer went away");
                    return;
                }
                if failed {
                    return;
                }
            }

            tracing::debug!(rows = records.len(), "Export stream complete");
        });

        Self { rx }
    }

    /// Next rendered line
    pub async fn next_line(&mut self) -> Option<ExportResult<String>> {
        self.rx.recv().await
    }

    /// Convert into a `Stream` of lines
    pub fn into_stream(self) -> impl Stream<Item = ExportResult<String>> + Send + 'static {
        stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|line| (line, rx))
        })
    }

    /// Drain into a single string
    pub async fn collect_string(mut self) -> ExportResult<String> {
        let mut out = String::new();
        while let Some(line) = self.next_line().await {
            out.push_str(&line?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::new()
                    .with("id", format!("d{}", i))
                    .with("name", format!("name, {}", i))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_stream_matches_buffered_format() {
        let formatter = ExportFormatter::with_columns(["id", "name"]);
        let data = records(25);

        let buffered = formatter.format(&data).unwrap();
        let streamed = ExportStream::spawn(formatter, data, 4)
            .collect_string()
            .await
            .unwrap();

        assert_eq!(streamed, buffered);
    }

    #[tokio::test]
    async fn test_stream_yields_header_first() {
        let formatter = ExportFormatter::with_columns(["id"]);
        let lines: Vec<_> = ExportStream::spawn(formatter, records(3), 1)
            .into_stream()
            .map(|l| l.unwrap())
            .collect()
            .await;

        assert_eq!(lines, vec!["id\n", "d0\n", "d1\n", "d2\n"]);
    }

    #[tokio::test]
    async fn test_producer_waits_for_consumer() {
        let formatter = ExportFormatter::with_columns(["id"]);
        let mut stream = ExportStream::spawn(formatter, records(100), 2);

        // Give the producer time to run ahead if it could
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(stream.rx.len() <= 2);

        assert_eq!(stream.next_line().await.unwrap().unwrap(), "id\n");
    }
}
