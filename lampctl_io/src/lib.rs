pub mod channel;
pub mod error;
pub mod replay;

pub use channel::{
    Connection, Connector, DEFAULT_REPLY_MAX_BYTES, Endpoint, SocketChannel, TcpChannel,
    TcpConnection, TcpConnector,
};
pub use replay::{ReplayCamera, ReplayDetector, ReplayScript};
