//! JSON-lines transport: one [`Message`] per line, in and out.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use derive_more::{Display, Error};
use exn::ResultExt;
use futures::Stream;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use updater_resolve::models::{Document, Message};

/// A line of input that could not be decoded as a [`Message`].
#[derive(Debug, Display, Error)]
#[display("line {line}: not a valid message")]
pub struct DecodeError {
    line: usize,
    source: serde_json::Error,
}
impl DecodeError {
    pub fn line(&self) -> usize {
        self.line
    }
}

/// One line of input: a message, or the reason it is not one.
pub type Line = std::result::Result<Message, DecodeError>;

pub async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin>> {
    Ok(match path {
        Some(path) => {
            let file = File::open(path).await.or_raise(|| ErrorKind::Input(path.to_path_buf()))?;
            Box::new(BufReader::new(file))
        },
        None => Box::new(BufReader::new(io::stdin())),
    })
}

pub async fn open_output(path: Option<&Path>) -> Result<Box<dyn AsyncWrite + Unpin>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path).await.or_raise(|| ErrorKind::Output(path.to_path_buf()))?;
            Box::new(BufWriter::new(file))
        },
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Decode every non-blank line of `reader` as a [`Message`].
///
/// Lines are split on raw bytes, so a line that is not valid UTF-8 is just
/// another undecodable line and reading carries on. An I/O error ends the
/// stream after it is yielded.
pub fn read_messages<R>(reader: R) -> impl Stream<Item = io::Result<Line>>
where
    R: AsyncBufRead + Unpin,
{
    stream! {
        let mut segments = reader.split(b'\n');
        let mut line = 0;
        loop {
            match segments.next_segment().await {
                Ok(Some(bytes)) => {
                    line += 1;
                    let bytes = bytes.strip_suffix(b"\r").unwrap_or(&bytes);
                    if bytes.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    yield Ok(serde_json::from_slice::<Message>(bytes).map_err(|source| DecodeError { line, source }));
                },
                Ok(None) => break,
                Err(err) => {
                    yield Err(err);
                    break;
                },
            }
        }
    }
}

/// Writes merged records as JSON lines.
pub struct MessageWriter<W> {
    writer: W,
}
impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write(&mut self, document: Document) -> Result<()> {
        let mut line = serde_json::to_vec(&Message::from(document)).or_raise(|| ErrorKind::Write)?;
        line.push(b'\n');
        self.writer.write_all(&line).await.or_raise(|| ErrorKind::Write)
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.or_raise(|| ErrorKind::Write)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}
