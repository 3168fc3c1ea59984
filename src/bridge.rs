//! Host side of the messaging channel.
//!
//! Messages arrive as newline-delimited JSON on the reader; acknowledgements
//! and `apiData` events leave as JSON lines on the writer.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::api::{Ack, ApiDataEvent, InterceptedRequest, Interceptor};
use crate::config::{SettingsHandle, SettingsUpdate};
use crate::download::{parse_message, DownloadQueue, DownloadRequest, QueueStats};
use crate::error::{Error, Result};

/// A decoded inbound message.
#[derive(Debug)]
pub enum BridgeMessage {
    /// An outbound request observed in the browser.
    Request(InterceptedRequest),
    Download(DownloadRequest),
    Settings(SettingsUpdate),
}

/// Decode one line. Anything unrecognised is a `MalformedMessage`.
pub fn parse_line(line: &str) -> Result<BridgeMessage> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| Error::MalformedMessage(format!("invalid JSON: {}", e)))?;

    match &value {
        Value::Array(_) => Ok(BridgeMessage::Download(parse_message(&value)?)),
        Value::Object(map) => match map.get("type").and_then(Value::as_str) {
            Some("request") => serde_json::from_value(value)
                .map(BridgeMessage::Request)
                .map_err(|e| Error::MalformedMessage(format!("bad request message: {}", e))),
            Some("settings") => serde_json::from_value(value)
                .map(BridgeMessage::Settings)
                .map_err(|e| Error::MalformedMessage(format!("bad settings message: {}", e))),
            Some(other) => Err(Error::MalformedMessage(format!("unknown message type '{}'", other))),
            None => Err(Error::MalformedMessage("message has no type".to_string())),
        },
        _ => Err(Error::MalformedMessage("expected an object or an array".to_string())),
    }
}

pub struct Bridge {
    interceptor: Arc<Interceptor>,
    queue: DownloadQueue,
    settings: SettingsHandle,
}

impl Bridge {
    pub fn new(interceptor: Arc<Interceptor>, queue: DownloadQueue, settings: SettingsHandle) -> Self {
        Self {
            interceptor,
            queue,
            settings,
        }
    }

    /// Handle one inbound line. Returns the acknowledgement to send back, if any.
    pub fn handle_line(&self, line: &str) -> Option<Ack> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match parse_line(line) {
            Ok(BridgeMessage::Request(request)) => {
                self.interceptor.observe(request);
                None
            }
            Ok(BridgeMessage::Download(request)) => Some(match self.queue.enqueue(request) {
                Ok(filename) => {
                    tracing::debug!("Accepted download {}", filename);
                    Ack::ok()
                }
                Err(e) => Ack::failed(e.to_string()),
            }),
            Ok(BridgeMessage::Settings(update)) => match self.settings.apply(&update) {
                Ok(_) => None,
                Err(e) => Some(Ack::failed(e.to_string())),
            },
            Err(e) => {
                tracing::warn!("Rejected message: {}", e);
                Some(Ack::failed(e.to_string()))
            }
        }
    }

    /// Serve until the reader reaches EOF, then wait for the queue to drain.
    ///
    /// Lines that are not UTF-8 are rejected like any other malformed message.
    /// A read or write failure stops intake, but accepted downloads still run.
    pub async fn run<R, W>(
        &self,
        mut reader: R,
        mut writer: W,
        mut events: mpsc::UnboundedReceiver<ApiDataEvent>,
    ) -> QueueStats
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let mut events_open = true;

        loop {
            // `read_until` keeps partial input in `buf` when the other branch wins.
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => {
                    match read {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!("Reading messages failed: {}", e);
                            break;
                        }
                    }
                    let ack = match std::str::from_utf8(&buf) {
                        Ok(line) => self.handle_line(line),
                        Err(e) => {
                            let e = Error::MalformedMessage(format!("invalid UTF-8: {}", e));
                            tracing::warn!("Rejected message: {}", e);
                            Some(Ack::failed(e.to_string()))
                        }
                    };
                    buf.clear();
                    if let Some(ack) = ack {
                        if let Err(e) = write_json(&mut writer, &ack).await {
                            tracing::warn!("Writing acknowledgement failed: {}", e);
                            break;
                        }
                    }
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        if let Err(e) = write_json(&mut writer, &event).await {
                            tracing::warn!("Writing API data failed: {}", e);
                            break;
                        }
                    }
                    None => events_open = false,
                },
            }
        }

        tracing::debug!("Input closed, waiting for {} queued downloads", self.queue.len());
        self.queue.close();
        self.queue.wait_idle().await;

        while let Ok(event) = events.try_recv() {
            if let Err(e) = write_json(&mut writer, &event).await {
                tracing::warn!("Writing API data failed: {}", e);
                break;
            }
        }

        self.queue.stats()
    }
}

async fn write_json<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EndpointMatcher, RefetchClient, API_BASE, DEFAULT_HEADER_DENYLIST};
    use crate::config::Settings;
    use crate::download::{RecordingNotifier, RecordingService};
    use crate::media::{ContentLabel, QualityTier};
    use crate::store::{CorrelationStore, DEFAULT_CAPACITY};
    use std::num::NonZeroUsize;
    use std::time::Duration;

    fn bridge(service: &RecordingService) -> (Bridge, SettingsHandle, mpsc::UnboundedReceiver<ApiDataEvent>) {
        let settings = SettingsHandle::new(Settings::default());
        let store = CorrelationStore::shared(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap(), None);
        let (tx, rx) = mpsc::unbounded_channel();
        let interceptor = Interceptor::new(
            EndpointMatcher::new(API_BASE).unwrap(),
            RefetchClient::new(DEFAULT_HEADER_DENYLIST, Duration::from_secs(1)).unwrap(),
            store,
            tx,
        );
        let queue = DownloadQueue::new(
            Arc::new(service.clone()),
            Arc::new(RecordingNotifier::default()),
            settings.subscribe(),
            Duration::from_millis(100),
        );
        (
            Bridge::new(Arc::new(interceptor), queue, settings.clone()),
            settings,
            rx,
        )
    }

    #[test]
    fn test_parse_line_variants() {
        assert!(matches!(
            parse_line(r#"["https://x/1.jpg","Bob","download"]"#).unwrap(),
            BridgeMessage::Download(r) if r.label == ContentLabel::Download
        ));
        assert!(matches!(
            parse_line(r#"{"type":"request","url":"https://apiv3.fansly.com/api/v1/post?ids=1","tabId":3}"#).unwrap(),
            BridgeMessage::Request(r) if r.tab_id == Some(3)
        ));
        assert!(matches!(
            parse_line(r#"{"type":"settings","quality":"720"}"#).unwrap(),
            BridgeMessage::Settings(_)
        ));
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        for line in ["not json", "42", r#"{"type":"other"}"#, r#"{"url":"x"}"#, r#"["x"]"#] {
            assert!(
                matches!(parse_line(line), Err(Error::MalformedMessage(_))),
                "line: {}",
                line
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_acks_and_drains() {
        let service = RecordingService::new(Duration::ZERO);
        let (bridge, settings, rx) = bridge(&service);

        let input = concat!(
            "{\"type\":\"settings\",\"quality\":\"240\",\"autoCreateFolder\":false}\n",
            "[\"https://x/a.jpg\",\"Bob\",\"download\"]\n",
            "\n",
            "garbage\n",
            "[\"https://x/b.mp4\",\"Bob\",\"download video\"]\n",
        );
        let mut output = Vec::new();
        let stats = bridge.run(input.as_bytes(), &mut output, rx).await;

        assert_eq!(stats, QueueStats { done: 2, failed: 0 });
        assert_eq!(settings.current().quality, QualityTier::P240);

        let acks: Vec<Ack> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(acks.len(), 3);
        assert_eq!(acks[0], Ack::ok());
        assert!(!acks[1].success);
        assert_eq!(acks[2], Ack::ok());

        let names: Vec<String> = service.calls().into_iter().map(|(_, o)| o.filename).collect();
        assert_eq!(names, vec!["a.jpg", "b.mp4"]);
    }

    #[test]
    fn test_invalid_settings_are_acked_as_failure() {
        tokio_test::block_on(async {
            let service = RecordingService::new(Duration::ZERO);
            let (bridge, _, _rx) = bridge(&service);
            let ack = bridge
                .handle_line(r#"{"type":"settings","quality":"8k"}"#)
                .unwrap();
            assert!(!ack.success);
            assert!(bridge.handle_line(r#"{"type":"settings","quality":"full"}"#).is_none());
        });
    }

    fn read_acks(output: Vec<u8>) -> Vec<Ack> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_utf8_is_rejected_and_reading_continues() {
        let service = RecordingService::new(Duration::ZERO);
        let (bridge, _, rx) = bridge(&service);

        let mut input = Vec::new();
        input.extend_from_slice(b"[\"https://x/a.jpg\",\"Bob\",\"download\"]\n");
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"[\"https://x/b.jpg\",\"Bob\",\"download\"]\n");

        let mut output = Vec::new();
        let stats = bridge.run(input.as_slice(), &mut output, rx).await;

        assert_eq!(stats, QueueStats { done: 2, failed: 0 });
        let acks = read_acks(output);
        assert_eq!(acks.len(), 3);
        assert_eq!(acks[0], Ack::ok());
        assert!(!acks[1].success);
        assert!(acks[1].error.as_deref().unwrap_or("").contains("UTF-8"));
        assert_eq!(acks[2], Ack::ok());

        let names: Vec<String> = service.calls().into_iter().map(|(_, o)| o.filename).collect();
        assert_eq!(names, vec!["Bob/a.jpg", "Bob/b.jpg"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_still_drains_accepted_downloads() {
        let service = RecordingService::new(Duration::from_millis(50));
        let (bridge, _, rx) = bridge(&service);

        let reader = tokio_test::io::Builder::new()
            .read(b"[\"https://x/a.jpg\",\"Bob\",\"download\"]\n")
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let mut output = Vec::new();
        let stats = bridge
            .run(tokio::io::BufReader::new(reader), &mut output, rx)
            .await;

        assert_eq!(read_acks(output), vec![Ack::ok()]);
        assert_eq!(stats, QueueStats { done: 1, failed: 0 });
        assert_eq!(service.calls().len(), 1);
    }
}
