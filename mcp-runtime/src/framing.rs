//! `Content-Length` framed JSON-RPC over a byte stream (stdio transport).

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::dispatcher::{Dispatcher, Reply, Session};
use crate::streamer::EmissionMode;

/// Reads the next frame body. `Ok(None)` on clean EOF between frames.
///
/// The body is returned undecoded so malformed JSON can still be answered
/// with a parse error instead of dropping the connection.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if !saw_header {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected EOF while reading frame headers",
            ));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if saw_header {
                break;
            }
            // Stray blank line between frames.
            continue;
        }
        saw_header = true;

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            let parsed = value.trim().parse::<usize>().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "invalid Content-Length header")
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing Content-Length header"))?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_frame<W>(writer: &mut W, value: &serde_json::Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let header = format!(
        "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await
}

/// Serves one long-lived session until the reader hits EOF.
///
/// Frames are written as separate messages in the order they are produced.
pub async fn serve<R, W>(dispatcher: &Dispatcher, mode: EmissionMode, reader: &mut R, writer: &mut W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = Session::default();
    while let Some(raw) = read_frame(reader).await? {
        match dispatcher.handle_bytes(&mut session, &raw, mode).await {
            Reply::Silent => {}
            Reply::Message(response) => write_frame(writer, &response).await?,
            Reply::Frames(mut frames) => {
                while let Some(frame) = frames.next_frame().await {
                    write_frame(writer, &frame).await?;
                }
            }
        }
    }
    tracing::debug!(event = "stdio_session_closed", protocol_version = session.protocol_version());
    Ok(())
}
