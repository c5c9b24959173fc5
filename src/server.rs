//! TCP dispenser for the line dealer.
//!
//! Accepts one connection at a time, writes the next unread line to it (or
//! the exit sentinel once the file is exhausted), and closes the connection.
//! After the configured number of exit notifications have been sent the
//! listener is closed and the server returns.

use crate::config::Config;
use crate::protocol::Response;
use crate::source::LineSource;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Server instance
pub struct Server {
    listener: TcpListener,
    source: LineSource,
    clients: u32,
}

impl Server {
    /// Bind the listening socket, with the listen backlog sized to the
    /// number of expected clients.
    pub async fn bind(config: &Config, source: LineSource) -> io::Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        let listener = create_listener(addr, config.clients)?;

        info!(address = %listener.local_addr()?, "server listening");

        Ok(Server {
            listener,
            source,
            clients: config.clients,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Dispense every line, one connection at a time, then notify the
    /// configured number of clients that input is exhausted.
    ///
    /// A connection gets exactly one delivery attempt: a failed write is
    /// logged and the line it consumed is not re-dispensed. Accept failures
    /// propagate and take the whole server down.
    pub async fn run(mut self) -> io::Result<()> {
        while let Some(line) = self.source.next_line().await? {
            let (stream, addr) = self.listener.accept().await?;
            debug!(peer = %addr, line = %line, "dispensing line");

            if let Err(e) = write_frame(stream, &Response::line(&line)).await {
                warn!(peer = %addr, error = %e, "failed to deliver line");
            }
        }

        let dispensed = self.source.dispensed();
        info!(
            lines = dispensed,
            clients = self.clients,
            "input exhausted, notifying clients"
        );

        let mut notified = 0u32;
        while notified < self.clients {
            let (stream, addr) = self.listener.accept().await?;
            debug!(peer = %addr, "sending exit");

            if let Err(e) = write_frame(stream, Response::exit()).await {
                warn!(peer = %addr, error = %e, "failed to deliver exit");
            }
            notified += 1;
        }

        // Connections beyond this point are never served
        drop(self.listener);
        info!(lines = dispensed, exits = notified, "server done");

        Ok(())
    }
}

/// Write a single frame, then close the connection.
async fn write_frame(mut stream: TcpStream, frame: &[u8]) -> io::Result<()> {
    stream.write_all(frame).await?;
    stream.shutdown().await
}

/// Create a TCP listener with an explicit listen backlog.
fn create_listener(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog as i32)?;

    TcpListener::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use tokio::io::AsyncReadExt;

    fn fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    async fn bind_server(path: &Path, clients: u32) -> (Server, SocketAddr) {
        let config = Config {
            inputfile: path.to_path_buf(),
            clients,
            port: 0,
        };
        let source = LineSource::open(path).await.unwrap();
        let server = Server::bind(&config, source).await.unwrap();
        let port = server.local_addr().unwrap().port();
        (server, SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    async fn fetch(addr: SocketAddr) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_dispenses_lines_in_order_then_exits() {
        let file = fixture("alpha\nbeta\ngamma\n");
        let (server, addr) = bind_server(file.path(), 2).await;
        let handle = tokio::spawn(server.run());

        assert_eq!(fetch(addr).await, "alpha\n");
        assert_eq!(fetch(addr).await, "beta\n");
        assert_eq!(fetch(addr).await, "gamma\n");
        assert_eq!(fetch(addr).await, "exit\n");
        assert_eq!(fetch(addr).await, "exit\n");

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_listener_closed_after_last_exit() {
        let file = fixture("only\n");
        let (server, addr) = bind_server(file.path(), 1).await;
        let handle = tokio::spawn(server.run());

        assert_eq!(fetch(addr).await, "only\n");
        assert_eq!(fetch(addr).await, "exit\n");
        handle.await.unwrap().unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_file_all_clients_get_exit() {
        let file = fixture("");
        let (server, addr) = bind_server(file.path(), 3).await;
        let handle = tokio::spawn(server.run());

        assert_eq!(fetch(addr).await, "exit\n");
        assert_eq!(fetch(addr).await, "exit\n");
        assert_eq!(fetch(addr).await, "exit\n");

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_zero_clients_no_exit_notifications() {
        let file = fixture("alpha\nbeta\n");
        let (server, addr) = bind_server(file.path(), 0).await;
        let handle = tokio::spawn(server.run());

        assert_eq!(fetch(addr).await, "alpha\n");
        assert_eq!(fetch(addr).await, "beta\n");

        // No exit phase: the server returns as soon as the file is drained
        handle.await.unwrap().unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_blank_line_delivered_as_bare_newline() {
        let file = fixture("alpha\n\n");
        let (server, addr) = bind_server(file.path(), 0).await;
        let handle = tokio::spawn(server.run());

        assert_eq!(fetch(addr).await, "alpha\n");
        assert_eq!(fetch(addr).await, "\n");

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_rejects_port_in_use() {
        let file = fixture("alpha\n");
        let (server, addr) = bind_server(file.path(), 0).await;

        let config = Config {
            inputfile: file.path().to_path_buf(),
            clients: 0,
            port: addr.port(),
        };
        let source = LineSource::open(file.path()).await.unwrap();
        assert!(Server::bind(&config, source).await.is_err());

        drop(server);
    }
}
