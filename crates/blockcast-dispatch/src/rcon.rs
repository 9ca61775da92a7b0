//! Blocking remote console (RCON) client.
//!
//! # Packet format
//!
//! All integers are little-endian `i32`.
//!
//! - `length`: byte count of everything after this field
//! - `request id`: echoed by the server; `-1` in a login reply means rejected
//! - `type`: 3 = login, 2 = command, 0 = command reply (2 again for login reply)
//! - body: ASCII/UTF-8 text followed by two NUL bytes

use std::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;

use crate::connection::{Connection, Connector};
use crate::error::{DispatchError, DispatchResult};

/// Login request.
pub const TYPE_LOGIN: i32 = 3;
/// Command request; also the type of a login reply.
pub const TYPE_COMMAND: i32 = 2;
/// Command reply.
pub const TYPE_RESPONSE: i32 = 0;

/// Request id plus type plus the two trailing NUL bytes.
const HEADER_LENGTH: usize = 10;
/// Largest reply body a server sends in one packet.
const MAX_RESPONSE_BODY: usize = 4096;
/// Largest command body servers accept.
pub const MAX_COMMAND_BODY: usize = 1446;

/// One RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub request_id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    #[must_use]
    pub fn new(request_id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            request_id,
            kind,
            body: body.into(),
        }
    }

    /// Serialize onto `writer` as a single write.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> DispatchResult<()> {
        let body = self.body.as_bytes();
        let length = i32::try_from(HEADER_LENGTH + body.len())
            .map_err(|_| DispatchError::protocol("packet body too large"))?;

        let mut buf = Vec::with_capacity(4 + HEADER_LENGTH + body.len());
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&self.request_id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }

    /// Read one packet from `reader`.
    ///
    /// A body over 4096 bytes is read past and reported as a protocol error,
    /// leaving the stream at the next packet. A length too short to hold the
    /// header means the stream is out of step, which is a framing error.
    pub fn read_from<R: Read>(reader: &mut R) -> DispatchResult<Self> {
        let frame = Frame::read_from(reader)?;
        Ok(Self {
            request_id: frame.request_id,
            kind: frame.kind,
            body: String::from_utf8_lossy(&frame.body).into_owned(),
        })
    }
}

/// A packet with its body still as raw bytes, so fragments split mid
/// character can be joined before decoding.
struct Frame {
    request_id: i32,
    kind: i32,
    body: Vec<u8>,
}

impl Frame {
    fn read_from<R: Read>(reader: &mut R) -> DispatchResult<Self> {
        let declared = read_i32(reader)?;
        let length = usize::try_from(declared)
            .ok()
            .filter(|len| *len >= HEADER_LENGTH)
            .ok_or_else(|| DispatchError::framing(format!("invalid packet length {declared}")))?;

        if length > HEADER_LENGTH + MAX_RESPONSE_BODY {
            let expected = u64::from(declared.unsigned_abs());
            let skipped = io::copy(&mut reader.by_ref().take(expected), &mut io::sink())?;
            if skipped < expected {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
            return Err(DispatchError::protocol(format!(
                "packet body of {} bytes exceeds {MAX_RESPONSE_BODY}",
                length - HEADER_LENGTH
            )));
        }

        let request_id = read_i32(reader)?;
        let kind = read_i32(reader)?;

        let mut payload = vec![0; length - 8];
        reader.read_exact(&mut payload)?;
        if !payload.ends_with(&[0, 0]) {
            return Err(DispatchError::protocol("packet is missing its terminator"));
        }
        payload.truncate(payload.len() - 2);

        Ok(Self {
            request_id,
            kind,
            body: payload,
        })
    }
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut bytes = [0; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

/// An authenticated RCON session over any byte stream.
pub struct RconConnection<S = TcpStream> {
    stream: S,
    next_id: i32,
    broken: bool,
}

impl<S: Read + Write> RconConnection<S> {
    /// Authenticate over an already connected stream.
    pub fn login(stream: S, password: &str) -> DispatchResult<Self> {
        let mut connection = Self {
            stream,
            next_id: 1,
            broken: false,
        };
        let id = connection.next_request_id();
        Packet::new(id, TYPE_LOGIN, password).write_to(&mut connection.stream)?;

        // Some servers send an empty command reply ahead of the login reply.
        loop {
            let reply = Packet::read_from(&mut connection.stream)?;
            if reply.kind != TYPE_COMMAND {
                continue;
            }
            if reply.request_id == -1 {
                return Err(DispatchError::Auth);
            }
            if reply.request_id != id {
                return Err(DispatchError::protocol(format!(
                    "login reply id {} does not match request {}",
                    reply.request_id, id
                )));
            }
            return Ok(connection);
        }
    }

    /// Send `command` and return the server's reply text.
    ///
    /// Long replies arrive as several packets carrying the command's request
    /// id. An empty type 0 packet follows every command; the server answers it
    /// after the last fragment, so its reply ends the command's reply.
    pub fn execute(&mut self, command: &str) -> DispatchResult<String> {
        if command.len() > MAX_COMMAND_BODY {
            return Err(DispatchError::protocol(format!(
                "command is {} bytes, limit is {}",
                command.len(),
                MAX_COMMAND_BODY
            )));
        }

        let result = self.exchange(command);
        if matches!(result, Err(DispatchError::Io(_) | DispatchError::Framing(_))) {
            self.broken = true;
        }
        result
    }

    fn exchange(&mut self, command: &str) -> DispatchResult<String> {
        let id = self.next_request_id();
        let marker = self.next_request_id();
        Packet::new(id, TYPE_COMMAND, command).write_to(&mut self.stream)?;
        Packet::new(marker, TYPE_RESPONSE, "").write_to(&mut self.stream)?;

        let mut body = Vec::new();
        let mut rejected = None;
        loop {
            match Frame::read_from(&mut self.stream) {
                Ok(frame) if frame.request_id == marker => break,
                Ok(frame) if frame.kind == TYPE_RESPONSE && frame.request_id == id => {
                    body.extend_from_slice(&frame.body);
                }
                Ok(frame) => {
                    rejected.get_or_insert_with(|| {
                        DispatchError::protocol(format!(
                            "unexpected reply (id {}, type {}) to request {}",
                            frame.request_id, frame.kind, id
                        ))
                    });
                }
                // Still in step with the stream; read on to the marker.
                Err(e @ DispatchError::Protocol(_)) => {
                    rejected.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }

        match rejected {
            Some(error) => Err(error),
            None => Ok(String::from_utf8_lossy(&body).into_owned()),
        }
    }

    fn next_request_id(&mut self) -> i32 {
        let id = self.next_id;
        // Stay positive; -1 is reserved for rejected logins.
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }
}

impl<S: Read + Write + Send> Connection for RconConnection<S> {
    fn command(&mut self, command: &str) -> DispatchResult<String> {
        self.execute(command)
    }

    fn is_broken(&self) -> bool {
        self.broken
    }

    fn close(mut self) -> DispatchResult<()> {
        self.stream.flush()?;
        Ok(())
    }
}

/// Opens authenticated RCON sessions over TCP.
#[derive(Clone)]
pub struct RconConnector {
    host: String,
    port: u16,
    password: String,
}

impl RconConnector {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
        }
    }
}

impl fmt::Debug for RconConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconConnector")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Connector for RconConnector {
    type Connection = RconConnection<TcpStream>;

    fn connect(&self) -> DispatchResult<Self::Connection> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))?;
        stream.set_nodelay(true)?;
        let connection = RconConnection::login(stream, &self.password)?;
        tracing::debug!("Connected to {}:{}", self.host, self.port);
        Ok(connection)
    }
}
