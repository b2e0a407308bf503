// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport codec — frames one request or response onto an encrypted byte
// stream.
//
// # Wire format
//
// Every frame starts with a 4-byte magic and a 1-byte version so a receiver
// fails fast on garbage. All length prefixes are 8-byte unsigned big-endian
// integers; payloads are raw binary, so delimiter scanning is never an
// option.
//
// ```text
// request:  "WNDL" 0x01
//           u64 BE header_len | header JSON (op, source_name, width?, height?)
//           u64 BE source_len | source bytes
//
// response: "WNDL" 0x01
//           u64 BE header_len | header JSON (status, error?)
//           u64 BE file_count
//           file_count x ( u64 BE name_len | name | u64 BE data_len | data )
// ```
//
// The header must parse structurally, but the operation *name* is carried
// as a plain string: resolving it (and validating parameters) is the
// dispatcher's job, so an unknown operation is reported as
// `UnsupportedOperation` rather than swallowed as a framing failure.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use wandler_core::error::{ErrorKind, Result, WandlerError};
use wandler_core::types::{ConversionRequest, Operation, OutputFile};

/// Frame preamble: magic bytes.
pub const MAGIC: &[u8; 4] = b"WNDL";

/// Frame preamble: protocol version.
pub const VERSION: u8 = 1;

/// Cap on the serialized header segment.
const MAX_HEADER_BYTES: u64 = 64 * 1024;

/// Cap on any single binary payload segment (source file or one output).
pub const MAX_PAYLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Cap on the number of files in a response (a PDF with more pages than
/// this is not a local-interactive workload).
const MAX_RESPONSE_FILES: u64 = 10_000;

/// Request header as serialized on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Operation wire name (`pdf_to_png`, `resize`, ...).
    pub op: String,
    /// Basename of the source file; drives output naming on the server.
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl RequestHeader {
    pub fn from_request(request: &ConversionRequest) -> Self {
        let (width, height) = match request.operation {
            Operation::Resize { width, height } => (Some(width), Some(height)),
            _ => (None, None),
        };
        Self {
            op: request.operation.wire_name().into(),
            source_name: request.source_name.clone(),
            width,
            height,
        }
    }

    /// Resolve the carried name and parameters into a validated
    /// `Operation`.
    pub fn parse_operation(&self) -> Result<Operation> {
        Operation::parse(&self.op, self.width, self.height)
    }
}

/// Response status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Error,
}

/// Failure payload carried in an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Response header as serialized on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireFailure>,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a request frame onto `writer`.
pub async fn write_request<W>(
    writer: &mut W,
    header: &RequestHeader,
    source: &[u8],
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let header_json = serde_json::to_vec(header)?;
    write_preamble(writer).await?;
    write_segment(writer, &header_json).await?;
    write_segment(writer, source).await?;
    writer.flush().await?;
    Ok(())
}

/// Encode a success response carrying the converted files.
pub async fn write_success<W>(writer: &mut W, files: &[OutputFile]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let header = ResponseHeader {
        status: Status::Ok,
        error: None,
    };
    let header_json = serde_json::to_vec(&header)?;
    write_preamble(writer).await?;
    write_segment(writer, &header_json).await?;
    writer.write_u64(files.len() as u64).await?;
    for file in files {
        write_segment(writer, file.name.as_bytes()).await?;
        write_segment(writer, &file.bytes).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Encode a failure response with the given kind and message.
pub async fn write_failure<W>(writer: &mut W, kind: ErrorKind, message: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let header = ResponseHeader {
        status: Status::Error,
        error: Some(WireFailure {
            kind,
            message: message.into(),
        }),
    };
    let header_json = serde_json::to_vec(&header)?;
    write_preamble(writer).await?;
    write_segment(writer, &header_json).await?;
    writer.write_u64(0).await?;
    writer.flush().await?;
    Ok(())
}

async fn write_preamble<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(MAGIC).await?;
    writer.write_u8(VERSION).await?;
    Ok(())
}

async fn write_segment<W>(writer: &mut W, data: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u64(data.len() as u64).await?;
    writer.write_all(data).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one request frame: the header plus the raw source bytes.
pub async fn read_request<R>(reader: &mut R) -> Result<(RequestHeader, Vec<u8>)>
where
    R: AsyncRead + Unpin,
{
    read_preamble(reader).await?;
    let header_bytes = read_segment(reader, MAX_HEADER_BYTES, "request header").await?;
    let header: RequestHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| WandlerError::Framing(format!("request header: {e}")))?;
    let source = read_segment(reader, MAX_PAYLOAD_BYTES, "source payload").await?;
    Ok((header, source))
}

/// Decode one response frame.
///
/// A failure response is surfaced as the matching `WandlerError` with the
/// server's message verbatim.
pub async fn read_response<R>(reader: &mut R) -> Result<Vec<OutputFile>>
where
    R: AsyncRead + Unpin,
{
    read_preamble(reader).await?;
    let header_bytes = read_segment(reader, MAX_HEADER_BYTES, "response header").await?;
    let header: ResponseHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| WandlerError::Framing(format!("response header: {e}")))?;

    let count = read_u64_framed(reader, "file count").await?;
    if count > MAX_RESPONSE_FILES {
        return Err(WandlerError::Framing(format!(
            "response declares {count} files (cap {MAX_RESPONSE_FILES})"
        )));
    }

    let mut files = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_bytes = read_segment(reader, MAX_HEADER_BYTES, "file name").await?;
        let name = String::from_utf8(name_bytes)
            .map_err(|_| WandlerError::Framing("file name is not UTF-8".into()))?;
        let bytes = read_segment(reader, MAX_PAYLOAD_BYTES, "file payload").await?;
        files.push(OutputFile { name, bytes });
    }

    match header.status {
        Status::Ok => Ok(files),
        Status::Error => {
            let failure = header.error.ok_or_else(|| {
                WandlerError::Framing("error status without failure payload".into())
            })?;
            Err(failure.kind.into_error(failure.message))
        }
    }
}

async fn read_preamble<R>(reader: &mut R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut preamble = [0u8; 5];
    read_exact_framed(reader, &mut preamble, "preamble").await?;
    if &preamble[0..4] != MAGIC {
        return Err(WandlerError::Framing("bad magic".into()));
    }
    if preamble[4] != VERSION {
        return Err(WandlerError::Framing(format!(
            "unsupported protocol version {}",
            preamble[4]
        )));
    }
    Ok(())
}

async fn read_segment<R>(reader: &mut R, cap: u64, what: &str) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let len = read_u64_framed(reader, what).await?;
    if len > cap {
        return Err(WandlerError::Framing(format!(
            "{what} declares {len} bytes (cap {cap})"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    read_exact_framed(reader, &mut buf, what).await?;
    Ok(buf)
}

async fn read_u64_framed<R>(reader: &mut R, what: &str) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8];
    read_exact_framed(reader, &mut buf, what).await?;
    Ok(u64::from_be_bytes(buf))
}

/// Any short read while inside a frame is a framing failure: the peer
/// declared more bytes than it delivered.
async fn read_exact_framed<R>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    reader
        .read_exact(buf)
        .await
        .map_err(|e| WandlerError::Framing(format!("stream ended reading {what}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wandler_core::types::Operation;

    fn sample_request() -> ConversionRequest {
        ConversionRequest {
            operation: Operation::Resize {
                width: 800,
                height: 600,
            },
            source_name: "photo.png".into(),
            source: vec![0xAB; 1024],
        }
    }

    #[tokio::test]
    async fn request_frame_round_trips() {
        let request = sample_request();
        let header = RequestHeader::from_request(&request);

        let (mut tx, mut rx) = tokio::io::duplex(64 * 1024);
        write_request(&mut tx, &header, &request.source)
            .await
            .expect("write");
        drop(tx);

        let (decoded, source) = read_request(&mut rx).await.expect("read");
        assert_eq!(decoded.op, "resize");
        assert_eq!(decoded.source_name, "photo.png");
        assert_eq!(decoded.parse_operation().expect("op"), request.operation);
        assert_eq!(source, request.source);
    }

    #[tokio::test]
    async fn success_response_round_trips_multiple_files() {
        let files = vec![
            OutputFile {
                name: "doc_page_1.png".into(),
                bytes: vec![1, 2, 3],
            },
            OutputFile {
                name: "doc_page_2.png".into(),
                bytes: vec![],
            },
        ];

        let (mut tx, mut rx) = tokio::io::duplex(64 * 1024);
        write_success(&mut tx, &files).await.expect("write");
        drop(tx);

        let decoded = read_response(&mut rx).await.expect("read");
        assert_eq!(decoded, files);
    }

    #[tokio::test]
    async fn failure_response_surfaces_kind_and_message_verbatim() {
        let (mut tx, mut rx) = tokio::io::duplex(4096);
        write_failure(&mut tx, ErrorKind::Decode, "not a valid PNG")
            .await
            .expect("write");
        drop(tx);

        let err = read_response(&mut rx).await.unwrap_err();
        assert!(matches!(err, WandlerError::Decode(_)));
        assert!(err.to_string().contains("not a valid PNG"));
    }

    #[tokio::test]
    async fn unknown_operation_name_is_dispatch_level_not_framing() {
        let header = RequestHeader {
            op: "img_rotate".into(),
            source_name: "a.png".into(),
            width: None,
            height: None,
        };
        let (mut tx, mut rx) = tokio::io::duplex(4096);
        write_request(&mut tx, &header, b"xx").await.expect("write");
        drop(tx);

        // Decodes fine; only operation resolution rejects it.
        let (decoded, _) = read_request(&mut rx).await.expect("read");
        let err = decoded.parse_operation().unwrap_err();
        assert!(matches!(err, WandlerError::UnsupportedOperation(_)));
    }

    #[tokio::test]
    async fn bad_magic_is_framing_error() {
        let (mut tx, mut rx) = tokio::io::duplex(4096);
        tx.write_all(b"NOPE\x01").await.expect("write");
        drop(tx);

        let err = read_request(&mut rx).await.unwrap_err();
        assert!(matches!(err, WandlerError::Framing(_)));
    }

    #[tokio::test]
    async fn wrong_version_is_framing_error() {
        let (mut tx, mut rx) = tokio::io::duplex(4096);
        tx.write_all(b"WNDL\x7f").await.expect("write");
        drop(tx);

        let err = read_request(&mut rx).await.unwrap_err();
        assert!(matches!(err, WandlerError::Framing(_)));
    }

    #[tokio::test]
    async fn truncated_payload_is_framing_error() {
        let request = sample_request();
        let header = RequestHeader::from_request(&request);

        let mut frame = Vec::new();
        write_request(&mut frame, &header, &request.source)
            .await
            .expect("write");
        frame.truncate(frame.len() - 100); // cut the declared payload short

        let (mut tx, mut rx) = tokio::io::duplex(64 * 1024);
        tx.write_all(&frame).await.expect("write");
        drop(tx);

        let err = read_request(&mut rx).await.unwrap_err();
        assert!(matches!(err, WandlerError::Framing(_)));
    }

    #[tokio::test]
    async fn oversized_header_length_is_rejected_before_allocation() {
        let (mut tx, mut rx) = tokio::io::duplex(4096);
        tx.write_all(MAGIC).await.expect("magic");
        tx.write_u8(VERSION).await.expect("version");
        tx.write_u64(u64::MAX).await.expect("length");
        drop(tx);

        let err = read_request(&mut rx).await.unwrap_err();
        assert!(matches!(err, WandlerError::Framing(_)));
    }

    #[tokio::test]
    async fn garbage_header_json_is_framing_error() {
        let (mut tx, mut rx) = tokio::io::duplex(4096);
        tx.write_all(MAGIC).await.expect("magic");
        tx.write_u8(VERSION).await.expect("version");
        tx.write_u64(4).await.expect("length");
        tx.write_all(b"{{{{").await.expect("body");
        drop(tx);

        let err = read_request(&mut rx).await.unwrap_err();
        assert!(matches!(err, WandlerError::Framing(_)));
    }
}
