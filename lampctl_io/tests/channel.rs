use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use lampctl_io::error::LinkError;
use lampctl_io::{Connection, Connector, Endpoint, SocketChannel, TcpChannel, TcpConnector};
use lampctl_traits::{Command, DeviceChannel, DeviceId, Reply};
use rstest::rstest;

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Ok,
    WriteFails,
    ReadFails,
    ConnectFails,
}

#[derive(Clone)]
struct CountingConnector {
    mode: Mode,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    written: Arc<std::sync::Mutex<Vec<(String, Vec<u8>)>>>,
}

impl CountingConnector {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            written: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

struct CountingConn {
    mode: Mode,
    host: String,
    closed: Arc<AtomicUsize>,
    written: Arc<std::sync::Mutex<Vec<(String, Vec<u8>)>>>,
}

impl Connection for CountingConn {
    fn write_all(&mut self, payload: &[u8]) -> std::io::Result<()> {
        if self.mode == Mode::WriteFails {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        }
        self.written
            .lock()
            .unwrap()
            .push((self.host.clone(), payload.to_vec()));
        Ok(())
    }

    fn read_reply(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.mode == Mode::ReadFails {
            return Err(std::io::Error::from(std::io::ErrorKind::TimedOut));
        }
        let msg = b"ack";
        buf[..msg.len()].copy_from_slice(msg);
        Ok(msg.len())
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Connector for CountingConnector {
    type Conn = CountingConn;

    fn connect(&self, endpoint: &Endpoint) -> lampctl_io::error::Result<CountingConn> {
        if self.mode == Mode::ConnectFails {
            return Err(LinkError::Connect {
                addr: endpoint.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(CountingConn {
            mode: self.mode,
            host: endpoint.host.clone(),
            closed: self.closed.clone(),
            written: self.written.clone(),
        })
    }
}

fn channel(conn: CountingConnector) -> SocketChannel<CountingConnector> {
    SocketChannel::new(
        conn,
        Endpoint::new("lamp-1", 8888),
        Endpoint::new("lamp-2", 8888),
    )
}

#[rstest]
#[case(Mode::Ok, true)]
#[case(Mode::ReadFails, true)]
#[case(Mode::WriteFails, false)]
fn every_opened_connection_is_closed_once(#[case] mode: Mode, #[case] ok: bool) {
    let conn = CountingConnector::new(mode);
    let ch = channel(conn.clone());

    for _ in 0..3 {
        let res = ch.send_command(DeviceId::Device1, Command::TurnOn);
        assert_eq!(res.is_ok(), ok);
    }

    assert_eq!(conn.opened.load(Ordering::SeqCst), 3);
    assert_eq!(conn.closed.load(Ordering::SeqCst), 3);
}

#[test]
fn write_failure_maps_to_write_error() {
    let ch = channel(CountingConnector::new(Mode::WriteFails));
    let err = ch
        .send_command(DeviceId::Device2, Command::TurnOff)
        .expect_err("write should fail");
    assert!(matches!(err, LinkError::Write(_)), "got {err:?}");
}

#[test]
fn connect_failure_opens_nothing() {
    let conn = CountingConnector::new(Mode::ConnectFails);
    let ch = channel(conn.clone());
    let err = ch
        .send(DeviceId::Device1, Command::TurnOn)
        .expect_err("connect should fail");
    assert!(err.downcast_ref::<LinkError>().is_some());
    assert_eq!(conn.closed.load(Ordering::SeqCst), 0);
}

#[test]
fn reply_read_failure_is_not_fatal() {
    let ch = channel(CountingConnector::new(Mode::ReadFails));
    let reply = ch
        .send_command(DeviceId::Device1, Command::TurnOn)
        .expect("read failure is ignored");
    assert_eq!(reply, Reply::default());
}

#[test]
fn routes_single_byte_to_device_endpoint() {
    let conn = CountingConnector::new(Mode::Ok);
    let ch = channel(conn.clone());
    let reply = ch.send_command(DeviceId::Device2, Command::TurnOn).unwrap();
    ch.send_command(DeviceId::Device1, Command::TurnOff).unwrap();

    assert_eq!(reply.text(), "ack");
    let written = conn.written.lock().unwrap().clone();
    assert_eq!(
        written,
        vec![
            ("lamp-2".to_string(), vec![b'0']),
            ("lamp-1".to_string(), vec![b'1']),
        ]
    );
}

#[test]
fn tcp_loopback_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let mut received = Vec::new();
        for _ in 0..2 {
            let (mut sock, _) = listener.accept().unwrap();
            let mut b = [0u8; 1];
            sock.read_exact(&mut b).unwrap();
            received.push(b[0]);
            sock.write_all(b"lamp ok").unwrap();
        }
        received
    });

    let connector = TcpConnector::new(Duration::from_millis(500), Duration::from_millis(500));
    let ch: TcpChannel = SocketChannel::new(
        connector,
        Endpoint::new("127.0.0.1", port),
        Endpoint::new("127.0.0.1", port),
    );

    let r1 = ch.send_command(DeviceId::Device1, Command::TurnOn).unwrap();
    let r2 = ch.send_command(DeviceId::Device2, Command::TurnOff).unwrap();
    assert_eq!(r1.text(), "lamp ok");
    assert_eq!(r2.text(), "lamp ok");
    assert_eq!(server.join().unwrap(), vec![b'0', b'1']);
}

#[test]
fn tcp_reply_is_capped() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        let mut b = [0u8; 1];
        sock.read_exact(&mut b).unwrap();
        let _ = sock.write_all(&[b'x'; 64]);
    });

    let connector = TcpConnector::new(Duration::from_millis(500), Duration::from_millis(500));
    let ch = SocketChannel::new(
        connector,
        Endpoint::new("127.0.0.1", port),
        Endpoint::new("127.0.0.1", port),
    )
    .with_reply_max_bytes(8);

    let reply = ch.send_command(DeviceId::Device1, Command::TurnOn).unwrap();
    assert!(reply.0.len() <= 8);
    server.join().unwrap();
}

#[test]
fn tcp_connect_refused_is_connect_error() {
    // Bind then drop to obtain a port that is very likely closed.
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let connector = TcpConnector::new(Duration::from_millis(200), Duration::from_millis(200));
    let ch = SocketChannel::new(
        connector,
        Endpoint::new("127.0.0.1", port),
        Endpoint::new("127.0.0.1", port),
    );
    let err = ch
        .send_command(DeviceId::Device1, Command::TurnOn)
        .expect_err("nothing listening");
    assert!(
        matches!(err, LinkError::Connect { .. } | LinkError::ConnectTimeout(_)),
        "got {err:?}"
    );
}
