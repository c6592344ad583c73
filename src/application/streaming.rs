//! Incremental delivery of model output to the user.
//!
//! Fragments are forwarded to an [`OutputSink`] the moment they arrive and are
//! accumulated at the same time, so the final text never has to be re-read
//! from the sink.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Destination for streamed text fragments.
#[async_trait]
pub trait OutputSink: Send {
    async fn emit(&mut self, fragment: &str) -> io::Result<()>;
}

/// Forwards fragments to a sink while accumulating the full text.
pub struct StreamCollector<'a> {
    sink: &'a mut dyn OutputSink,
    buffer: String,
}

impl<'a> StreamCollector<'a> {
    pub fn new(sink: &'a mut dyn OutputSink) -> Self {
        Self {
            sink,
            buffer: String::new(),
        }
    }

    pub async fn push(&mut self, fragment: &str) -> io::Result<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        self.sink.emit(fragment).await?;
        self.buffer.push_str(fragment);
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Concatenation of every fragment pushed so far.
    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Writes each fragment to a terminal-like writer and flushes immediately.
pub struct ConsoleSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutputSink for ConsoleSink<W> {
    async fn emit(&mut self, fragment: &str) -> io::Result<()> {
        self.writer.write_all(fragment.as_bytes()).await?;
        self.writer.flush().await
    }
}

/// In-memory sink that keeps every fragment separately.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    fragments: Vec<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

#[async_trait]
impl OutputSink for BufferSink {
    async fn emit(&mut self, fragment: &str) -> io::Result<()> {
        self.fragments.push(fragment.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collector_forwards_fragments_in_order() {
        let mut sink = BufferSink::new();
        let mut collector = StreamCollector::new(&mut sink);
        for fragment in ["On branch ", "", "main", "\n"] {
            collector.push(fragment).await.unwrap();
        }
        assert_eq!(collector.text(), "On branch main\n");
        let text = collector.finish();

        assert_eq!(text, "On branch main\n");
        assert_eq!(sink.fragments(), ["On branch ", "main", "\n"]);
    }

    #[tokio::test]
    async fn console_sink_writes_through() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.emit("hello ").await.unwrap();
        sink.emit("world").await.unwrap();
        assert_eq!(sink.into_inner(), b"hello world");
    }

    struct BrokenPipe;

    #[async_trait]
    impl OutputSink for BrokenPipe {
        async fn emit(&mut self, _fragment: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[tokio::test]
    async fn sink_failure_is_reported_and_not_accumulated() {
        let mut sink = BrokenPipe;
        let mut collector = StreamCollector::new(&mut sink);
        assert!(collector.push("lost").await.is_err());
        assert_eq!(collector.finish(), "");
    }
}
