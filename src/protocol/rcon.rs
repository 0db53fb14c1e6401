// src/protocol/rcon.rs
// Source RCON as spoken by Minecraft: little-endian i32 length, request id, type, body, two NULs.
use std::io;
use async_trait::async_trait;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use log::debug;
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use crate::models::server::ServerAddress;
use crate::resolver::{ConsoleSession, ConsoleTransport, ResolveError};

const PACKET_RESPONSE: i32 = 0;
const PACKET_EXEC: i32 = 2;
const PACKET_AUTH_RESPONSE: i32 = 2;
const PACKET_AUTH: i32 = 3;

const AUTH_FAILED_ID: i32 = -1;
const MIN_PACKET_LEN: i32 = 10;
const MAX_PACKET_LEN: i32 = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self { id, kind, body: body.into() }
    }

    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let body = self.body.as_bytes();
        let mut buf = Vec::with_capacity(body.len() + 14);
        buf.write_i32::<LittleEndian>(body.len() as i32 + MIN_PACKET_LEN)?;
        buf.write_i32::<LittleEndian>(self.id)?;
        buf.write_i32::<LittleEndian>(self.kind)?;
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        Ok(buf)
    }
}

async fn write_packet<W: AsyncWrite + Unpin>(writer: &mut W, packet: &Packet) -> Result<(), ResolveError> {
    use tokio::io::AsyncWriteExt;

    writer.write_all(&packet.encode()?).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Packet, ResolveError> {
    use tokio::io::AsyncReadExt;

    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;
    let len = LittleEndian::read_i32(&header);
    if !(MIN_PACKET_LEN..=MAX_PACKET_LEN).contains(&len) {
        return Err(ResolveError::Protocol(format!("invalid RCON packet length {}", len)));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    let id = LittleEndian::read_i32(&payload[0..4]);
    let kind = LittleEndian::read_i32(&payload[4..8]);
    let body = String::from_utf8_lossy(&payload[8..payload.len() - 2]).into_owned();
    Ok(Packet { id, kind, body })
}

fn next_request_id() -> i32 {
    rand::thread_rng().gen_range(1..i32::MAX)
}

fn next_request_id_besides(taken: i32) -> i32 {
    loop {
        let id = next_request_id();
        if id != taken {
            return id;
        }
    }
}

/// Opens RCON sessions over TCP.
pub struct RconTransport;

#[async_trait]
impl ConsoleTransport for RconTransport {
    async fn probe(&self, address: &ServerAddress) -> Result<(), ResolveError> {
        use tokio::io::AsyncWriteExt;

        let mut stream = TcpStream::connect((address.host.as_str(), address.console_port)).await?;
        if let Err(e) = stream.shutdown().await {
            debug!("RCON probe socket to {} did not shut down cleanly: {}", address.console_endpoint(), e);
        }
        Ok(())
    }

    async fn open(&self, address: &ServerAddress) -> Result<Box<dyn ConsoleSession>, ResolveError> {
        let session = RconSession::connect(address).await?;
        Ok(Box::new(session))
    }
}

/// An authenticated console connection. Dropping it closes the socket.
pub struct RconSession {
    stream: TcpStream,
    endpoint: String,
}

impl RconSession {
    pub async fn connect(address: &ServerAddress) -> Result<Self, ResolveError> {
        let stream = TcpStream::connect((address.host.as_str(), address.console_port)).await?;
        let mut session = Self {
            stream,
            endpoint: address.console_endpoint(),
        };
        session.authenticate(&address.console_secret).await?;
        debug!("RCON session to {} authenticated", session.endpoint);
        Ok(session)
    }

    async fn authenticate(&mut self, secret: &str) -> Result<(), ResolveError> {
        let id = next_request_id();
        write_packet(&mut self.stream, &Packet::new(id, PACKET_AUTH, secret)).await?;

        // Tolerates servers that send an empty RESPONSE_VALUE ahead of the auth response.
        loop {
            let reply = read_packet(&mut self.stream).await?;
            if reply.kind != PACKET_AUTH_RESPONSE {
                continue;
            }
            if reply.id == AUTH_FAILED_ID {
                return Err(ResolveError::Protocol("RCON authentication rejected".to_string()));
            }
            if reply.id != id {
                return Err(ResolveError::Protocol(format!(
                    "RCON auth response for request {} while waiting for {}",
                    reply.id, id
                )));
            }
            return Ok(());
        }
    }

    /// Long replies arrive split over several packets. The server answers
    /// requests in order, so the reply to a trailing empty RESPONSE_VALUE
    /// packet marks the end of the command output.
    pub async fn command(&mut self, command: &str) -> Result<String, ResolveError> {
        let id = next_request_id();
        let end_marker = next_request_id_besides(id);
        write_packet(&mut self.stream, &Packet::new(id, PACKET_EXEC, command)).await?;
        write_packet(&mut self.stream, &Packet::new(end_marker, PACKET_RESPONSE, "")).await?;

        let mut output = String::new();
        let mut fragments = 0;
        loop {
            let reply = read_packet(&mut self.stream).await?;
            if reply.id == AUTH_FAILED_ID {
                return Err(ResolveError::Protocol("RCON session is not authenticated".to_string()));
            }
            if reply.id == end_marker {
                if fragments > 1 {
                    debug!("RCON reply from {} arrived in {} packets", self.endpoint, fragments);
                }
                return Ok(output);
            }
            if reply.id != id || reply.kind != PACKET_RESPONSE {
                return Err(ResolveError::Protocol(format!(
                    "unexpected RCON reply (id {}, type {})",
                    reply.id, reply.kind
                )));
            }
            output.push_str(&reply.body);
            fragments += 1;
        }
    }
}

#[async_trait]
impl ConsoleSession for RconSession {
    async fn execute(&mut self, command: &str) -> Result<String, ResolveError> {
        self.command(command).await
    }

    async fn close(self: Box<Self>) {
        use tokio::io::AsyncWriteExt;

        let RconSession { mut stream, endpoint } = *self;
        match stream.shutdown().await {
            Ok(()) => debug!("RCON session to {} closed", endpoint),
            Err(e) => debug!("RCON session to {} closed uncleanly: {}", endpoint, e),
        }
    }
}
