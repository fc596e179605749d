//! One-shot TCP command channel.
//!
//! Every `send` opens a fresh connection, writes one command byte, reads a
//! bounded reply for logging, and closes the connection on every path.
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use lampctl_traits::{Command, DeviceChannel, DeviceId, Reply};

use crate::error::{LinkError, Result};

/// Where a device listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An open, single-use connection.
pub trait Connection {
    fn write_all(&mut self, payload: &[u8]) -> std::io::Result<()>;
    /// One read of at most `buf.len()` bytes.
    fn read_reply(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
    fn close(&mut self);
}

/// Opens connections to endpoints.
pub trait Connector: Send + Sync {
    type Conn: Connection;
    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Conn>;
}

#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            io_timeout,
        }
    }
}

impl Connector for TcpConnector {
    type Conn = TcpConnection;

    fn connect(&self, endpoint: &Endpoint) -> Result<TcpConnection> {
        let addrs = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| LinkError::Connect {
                addr: endpoint.to_string(),
                source: e,
            })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.io_timeout))?;
                    stream.set_write_timeout(Some(self.io_timeout))?;
                    let _ = stream.set_nodelay(true);
                    return Ok(TcpConnection {
                        stream: Some(stream),
                    });
                }
                Err(e) => last_err = Some((addr, e)),
            }
        }

        match last_err {
            Some((addr, e)) if e.kind() == std::io::ErrorKind::TimedOut => {
                Err(LinkError::ConnectTimeout(addr.to_string()))
            }
            Some((addr, e)) => Err(LinkError::Connect {
                addr: addr.to_string(),
                source: e,
            }),
            None => Err(LinkError::Resolve(endpoint.to_string())),
        }
    }
}

pub struct TcpConnection {
    stream: Option<TcpStream>,
}

impl Connection for TcpConnection {
    fn write_all(&mut self, payload: &[u8]) -> std::io::Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected))?;
        stream.write_all(payload)?;
        stream.flush()
    }

    fn read_reply(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotConnected))?;
        stream.read(buf)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Device channel over any `Connector`; the production form is `TcpChannel`.
pub struct SocketChannel<C: Connector> {
    connector: C,
    device1: Endpoint,
    device2: Endpoint,
    reply_max_bytes: usize,
}

pub type TcpChannel = SocketChannel<TcpConnector>;

/// Reply bytes read per command unless configured otherwise.
pub const DEFAULT_REPLY_MAX_BYTES: usize = 200;

impl<C: Connector> SocketChannel<C> {
    pub fn new(connector: C, device1: Endpoint, device2: Endpoint) -> Self {
        Self {
            connector,
            device1,
            device2,
            reply_max_bytes: DEFAULT_REPLY_MAX_BYTES,
        }
    }

    pub fn with_reply_max_bytes(mut self, n: usize) -> Self {
        self.reply_max_bytes = n.max(1);
        self
    }

    pub fn endpoint(&self, device: DeviceId) -> &Endpoint {
        match device {
            DeviceId::Device1 => &self.device1,
            DeviceId::Device2 => &self.device2,
        }
    }

    /// Connect, write one byte, read the reply, close.
    pub fn send_command(&self, device: DeviceId, command: Command) -> Result<Reply> {
        let endpoint = self.endpoint(device);
        tracing::debug!(%device, %endpoint, "connecting");
        let mut conn = self.connector.connect(endpoint)?;

        let payload = [command.wire_byte()];
        tracing::debug!(%device, %command, payload = %char::from(payload[0]), "sending");
        if let Err(e) = conn.write_all(&payload) {
            conn.close();
            return Err(LinkError::Write(e));
        }

        let mut buf = vec![0u8; self.reply_max_bytes];
        let reply = match conn.read_reply(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Reply(buf)
            }
            Err(e) => {
                tracing::warn!(%device, error = %e, "reply read failed; ignoring");
                Reply::default()
            }
        };
        tracing::debug!(%device, received = %reply.text(), "closing connection");
        conn.close();
        Ok(reply)
    }
}

impl<C: Connector> DeviceChannel for SocketChannel<C> {
    fn send(
        &self,
        device: DeviceId,
        command: Command,
    ) -> std::result::Result<Reply, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.send_command(device, command)?)
    }
}
