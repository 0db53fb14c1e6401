// src/protocol/slp.rs
// Minecraft Java "Server List Ping": handshake, status request, ping/pong.
use std::io::{self, Read};
use std::time::Instant;
use async_trait::async_trait;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use crate::models::server::ServerAddress;
use crate::models::status::ProbeReport;
use crate::resolver::{ResolveError, StatusProbe};

const HANDSHAKE_PROTOCOL_VERSION: i32 = 47;
const NEXT_STATE_STATUS: i32 = 1;
const PACKET_STATUS: i32 = 0x00;
const PACKET_PING: i32 = 0x01;
const MAX_PACKET_LEN: i32 = 2 * 1024 * 1024;

pub struct JavaStatusProbe;

#[async_trait]
impl StatusProbe for JavaStatusProbe {
    async fn probe(&self, address: &ServerAddress) -> Result<ProbeReport, ResolveError> {
        use tokio::io::AsyncWriteExt;

        let mut stream = TcpStream::connect((address.host.as_str(), address.query_port)).await?;
        let report = query(&mut stream, address).await;
        if let Err(e) = stream.shutdown().await {
            debug!("Status socket to {} did not shut down cleanly: {}", address, e);
        }
        report
    }
}

async fn query<S>(stream: &mut S, address: &ServerAddress) -> Result<ProbeReport, ResolveError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_packet(stream, &handshake(&address.host, address.query_port)?).await?;
    write_packet(stream, &packet_id(PACKET_STATUS)).await?;

    let payload = read_packet(stream).await?;
    let mut rest = payload.as_slice();
    let id = read_varint(&mut rest)?;
    if id != PACKET_STATUS {
        return Err(ResolveError::Protocol(format!("expected status packet, got id {:#04x}", id)));
    }
    let json = read_string(&mut rest)?;
    let status: StatusJson = serde_json::from_str(&json)
        .map_err(|e| ResolveError::Protocol(format!("invalid status JSON: {}", e)))?;

    let token: i64 = rand::random();
    let mut ping = packet_id(PACKET_PING);
    ping.write_i64::<BigEndian>(token)?;

    let started = Instant::now();
    write_packet(stream, &ping).await?;
    let pong = read_packet(stream).await?;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut rest = pong.as_slice();
    if read_varint(&mut rest)? != PACKET_PING {
        return Err(ResolveError::Protocol("expected pong packet".to_string()));
    }
    if rest.read_i64::<BigEndian>()? != token {
        return Err(ResolveError::Protocol("pong payload does not match ping".to_string()));
    }

    Ok(status.into_report(latency_ms))
}

#[derive(Debug, Default, Deserialize)]
struct StatusJson {
    #[serde(default)]
    version: VersionJson,
    #[serde(default)]
    players: PlayersJson,
    #[serde(default)]
    description: Value,
}

#[derive(Debug, Default, Deserialize)]
struct VersionJson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    protocol: i32,
}

#[derive(Debug, Default, Deserialize)]
struct PlayersJson {
    #[serde(default)]
    max: u32,
    #[serde(default)]
    online: u32,
    #[serde(default)]
    sample: Option<Vec<SampleJson>>,
}

#[derive(Debug, Deserialize)]
struct SampleJson {
    name: String,
}

impl StatusJson {
    fn into_report(self, latency_ms: f64) -> ProbeReport {
        let mut description = String::new();
        flatten_text(&self.description, &mut description);
        ProbeReport {
            players_online: self.players.online,
            players_max: self.players.max,
            sample: self.players.sample
                .unwrap_or_default()
                .into_iter()
                .map(|player| strip_formatting(&player.name))
                .collect(),
            version: strip_formatting(&self.version.name),
            protocol: self.version.protocol,
            description: strip_formatting(description.trim()),
            latency_ms,
        }
    }
}

/// Chat components nest via `extra`; plain strings are the legacy form.
fn flatten_text(value: &Value, out: &mut String) {
    match value {
        Value::String(text) => out.push_str(text),
        Value::Array(parts) => {
            for part in parts {
                flatten_text(part, out);
            }
        }
        Value::Object(map) => {
            if let Some(text) = map.get("text") {
                flatten_text(text, out);
            }
            if let Some(extra) = map.get("extra") {
                flatten_text(extra, out);
            }
        }
        _ => {}
    }
}

/// Drops `§x` colour and style codes.
fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

fn handshake(host: &str, port: u16) -> io::Result<Vec<u8>> {
    let mut body = packet_id(0x00);
    write_varint(&mut body, HANDSHAKE_PROTOCOL_VERSION);
    write_varint(&mut body, host.len() as i32);
    body.extend_from_slice(host.as_bytes());
    body.write_u16::<BigEndian>(port)?;
    write_varint(&mut body, NEXT_STATE_STATUS);
    Ok(body)
}

fn packet_id(id: i32) -> Vec<u8> {
    let mut body = Vec::with_capacity(16);
    write_varint(&mut body, id);
    body
}

fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut remaining = value as u32;
    loop {
        if remaining & !0x7F == 0 {
            buf.push(remaining as u8);
            return;
        }
        buf.push(((remaining & 0x7F) | 0x80) as u8);
        remaining >>= 7;
    }
}

fn read_varint<R: Read>(reader: &mut R) -> Result<i32, ResolveError> {
    let mut value: i32 = 0;
    for position in 0..5 {
        let byte = reader.read_u8()?;
        value |= ((byte & 0x7F) as i32) << (7 * position);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ResolveError::Protocol("VarInt is longer than 5 bytes".to_string()))
}

fn read_string(rest: &mut &[u8]) -> Result<String, ResolveError> {
    let len = read_varint(rest)?;
    if len < 0 || len as usize > rest.len() {
        return Err(ResolveError::Protocol(format!("string length {} out of bounds", len)));
    }
    let (text, tail) = rest.split_at(len as usize);
    *rest = tail;
    String::from_utf8(text.to_vec())
        .map_err(|e| ResolveError::Protocol(format!("status JSON is not UTF-8: {}", e)))
}

// Tokio's extension traits stay local: they clash with byteorder's on Vec<u8> and &[u8].
async fn write_packet<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> Result<(), ResolveError> {
    use tokio::io::AsyncWriteExt;

    let mut frame = Vec::with_capacity(body.len() + 5);
    write_varint(&mut frame, body.len() as i32);
    frame.extend_from_slice(body);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ResolveError> {
    use tokio::io::AsyncReadExt;

    let mut len: i32 = 0;
    let mut terminated = false;
    for position in 0..5 {
        let byte = reader.read_u8().await?;
        len |= ((byte & 0x7F) as i32) << (7 * position);
        if byte & 0x80 == 0 {
            terminated = true;
            break;
        }
    }
    if !terminated || len <= 0 || len > MAX_PACKET_LEN {
        return Err(ResolveError::Protocol(format!("invalid packet length {}", len)));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn address(port: u16) -> ServerAddress {
        ServerAddress {
            host: "127.0.0.1".to_string(),
            query_port: port,
            console_port: 25575,
            console_secret: String::new(),
        }
    }

    async fn serve_status(listener: TcpListener, json: String, status_id: i32) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let handshake = read_packet(&mut socket).await.unwrap();
        assert_eq!(handshake[0], 0x00);
        let request = read_packet(&mut socket).await.unwrap();
        assert_eq!(request, vec![0x00]);

        let mut body = packet_id(status_id);
        write_varint(&mut body, json.len() as i32);
        body.extend_from_slice(json.as_bytes());
        write_packet(&mut socket, &body).await.unwrap();

        if let Ok(ping) = read_packet(&mut socket).await {
            write_packet(&mut socket, &ping).await.unwrap();
        }
    }

    #[test]
    fn varint_encoding_matches_reference_values() {
        for (value, bytes) in [
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7f]),
            (128, vec![0x80, 0x01]),
            (25565, vec![0xdd, 0xc7, 0x01]),
            (-1, vec![0xff, 0xff, 0xff, 0xff, 0x0f]),
        ] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            assert_eq!(buf, bytes);
            assert_eq!(read_varint(&mut bytes.as_slice()).unwrap(), value);
        }
    }

    #[test]
    fn description_components_are_flattened() {
        let value: Value = serde_json::from_str(
            r#"{"text": "§aHello ", "extra": [{"text": "brave"}, " new ", {"text": "world", "bold": true}]}"#,
        )
        .unwrap();
        let mut out = String::new();
        flatten_text(&value, &mut out);
        assert_eq!(strip_formatting(&out), "Hello brave new world");
    }

    #[tokio::test]
    async fn probes_a_status_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let json = r#"{
            "version": {"name": "1.20.4", "protocol": 765},
            "players": {"max": 20, "online": 2, "sample": [
                {"name": "Steve", "id": "00000000-0000-0000-0000-000000000001"},
                {"name": "§cAlex", "id": "00000000-0000-0000-0000-000000000002"}
            ]},
            "description": {"text": "A Minecraft Server"}
        }"#;
        let server = tokio::spawn(serve_status(listener, json.to_string(), PACKET_STATUS));

        let report = JavaStatusProbe.probe(&address(port)).await.unwrap();
        server.await.unwrap();

        assert_eq!(report.players_online, 2);
        assert_eq!(report.players_max, 20);
        assert_eq!(report.sample, vec!["Steve".to_string(), "Alex".to_string()]);
        assert_eq!(report.version, "1.20.4");
        assert_eq!(report.protocol, 765);
        assert_eq!(report.description, "A Minecraft Server");
        assert!(report.latency_ms >= 0.0);
    }

    #[tokio::test]
    async fn wrong_packet_id_is_a_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_status(listener, "{}".to_string(), 0x05));

        let result = JavaStatusProbe.probe(&address(port)).await;
        server.await.unwrap();
        assert!(matches!(result, Err(ResolveError::Protocol(_))));
    }

    #[tokio::test]
    async fn closed_port_is_a_connectivity_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = JavaStatusProbe.probe(&address(port)).await;
        assert!(matches!(result, Err(ResolveError::Connectivity(_))));
    }
}
