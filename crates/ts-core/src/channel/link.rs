//! TCP endpoints of the duplex channel.
//!
//! The decision endpoint listens and accepts exactly one robot endpoint.
//! Both sides run a strict request/response lockstep, so one `read` returns
//! one message.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use ts_common::{Observation, Position};

use super::wire::{self, RobotMessage, WireError, MAX_MESSAGE_BYTES};
use super::{DecisionTransport, RobotTransport};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no message within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("peer closed the channel")]
    Closed,

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl From<ChannelError> for ts_common::Error {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Timeout { seconds } => ts_common::Error::ChannelTimeout { seconds },
            ChannelError::Closed => ts_common::Error::ChannelClosed,
            ChannelError::Wire(w) => w.into(),
            other => ts_common::Error::Communication(other.to_string()),
        }
    }
}

/// Message framing shared by both endpoints.
#[derive(Debug)]
struct Framed {
    stream: TcpStream,
    timeout: Duration,
}

impl Framed {
    fn new(stream: TcpStream, timeout: Duration) -> Result<Self, ChannelError> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(Framed { stream, timeout })
    }

    fn read_message(&mut self) -> Result<Vec<u8>, ChannelError> {
        let mut buf = [0u8; MAX_MESSAGE_BYTES];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Err(ChannelError::Closed),
                Ok(n) => return Ok(buf[..n].to_vec()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(ChannelError::Timeout {
                        seconds: self.timeout.as_secs(),
                    })
                }
                Err(e) if is_disconnect(&e) => return Err(ChannelError::Closed),
                Err(e) => return Err(ChannelError::Io(e)),
            }
        }
    }

    fn write_message(&mut self, message: &str) -> Result<(), ChannelError> {
        self.stream.write_all(message.as_bytes()).map_err(|e| {
            if is_disconnect(&e) {
                ChannelError::Closed
            } else {
                ChannelError::Io(e)
            }
        })?;
        self.stream.flush()?;
        Ok(())
    }

    fn peer(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}

/// Listening socket of the decision endpoint.
#[derive(Debug)]
pub struct DecisionListener {
    listener: TcpListener,
    timeout: Duration,
}

impl DecisionListener {
    /// Bind `addr` (port 0 picks an ephemeral port).
    pub fn bind(addr: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr).map_err(|source| ChannelError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(DecisionListener { listener, timeout })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.listener.local_addr()?)
    }

    /// Block until the robot endpoint connects.
    pub fn accept(&self) -> Result<DecisionLink, ChannelError> {
        let (stream, _) = self.listener.accept()?;
        Ok(DecisionLink {
            framed: Framed::new(stream, self.timeout)?,
        })
    }
}

/// Decision side of an established channel.
#[derive(Debug)]
pub struct DecisionLink {
    framed: Framed,
}

impl DecisionLink {
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.framed.peer()
    }
}

impl DecisionTransport for DecisionLink {
    fn receive(&mut self) -> Result<RobotMessage, ChannelError> {
        let raw = self.framed.read_message()?;
        Ok(wire::parse_robot_message(&raw)?)
    }

    fn send_position(&mut self, position: Position) -> Result<(), ChannelError> {
        self.framed.write_message(&wire::encode_position(position))
    }

    fn close(&mut self) {
        self.framed.shutdown();
    }
}

/// Robot side of an established channel.
#[derive(Debug)]
pub struct RobotLink {
    framed: Framed,
}

impl RobotLink {
    /// Connect to the decision endpoint, trying each resolved address in turn.
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let connect_err = |source| ChannelError::Connect {
            addr: addr.to_string(),
            source,
        };
        let candidates = addr.to_socket_addrs().map_err(connect_err)?;

        let mut last = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(stream) => {
                    return Ok(RobotLink {
                        framed: Framed::new(stream, timeout)?,
                    })
                }
                Err(e) => last = Some(e),
            }
        }
        Err(connect_err(last.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, "address resolved to nothing")
        })))
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.framed.peer()
    }
}

impl RobotTransport for RobotLink {
    fn send_observation(&mut self, observation: Observation) -> Result<(), ChannelError> {
        self.framed.write_message(&wire::encode_observation(observation))
    }

    fn receive_position(&mut self) -> Result<Position, ChannelError> {
        let raw = self.framed.read_message()?;
        Ok(wire::parse_position(&raw)?)
    }

    fn send_end(&mut self) -> Result<(), ChannelError> {
        self.framed.write_message(wire::encode_end())
    }

    fn close(&mut self) {
        self.framed.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn pair() -> (DecisionLink, RobotLink) {
        let listener = DecisionListener::bind("127.0.0.1:0", TIMEOUT).unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let robot = thread::spawn(move || RobotLink::connect(&addr, TIMEOUT).unwrap());
        let decision = listener.accept().unwrap();
        (decision, robot.join().unwrap())
    }

    #[test]
    fn lockstep_exchange() {
        let (mut decision, mut robot) = pair();
        robot.send_observation(Observation::Touched).unwrap();
        assert_eq!(
            decision.receive().unwrap(),
            RobotMessage::Observation(Observation::Touched)
        );
        decision.send_position(Position::new(5).unwrap()).unwrap();
        assert_eq!(robot.receive_position().unwrap().index(), 5);

        robot.send_end().unwrap();
        assert_eq!(decision.receive().unwrap(), RobotMessage::End);
    }

    #[test]
    fn eof_is_closed() {
        let (mut decision, mut robot) = pair();
        robot.close();
        assert!(matches!(decision.receive(), Err(ChannelError::Closed)));
    }

    #[test]
    fn read_timeout_is_reported() {
        let listener = DecisionListener::bind("127.0.0.1:0", Duration::from_millis(100)).unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let robot = thread::spawn(move || RobotLink::connect(&addr, TIMEOUT).unwrap());
        let mut decision = listener.accept().unwrap();
        let _robot = robot.join().unwrap();
        assert!(matches!(decision.receive(), Err(ChannelError::Timeout { .. })));
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        let (mut decision, mut robot) = pair();
        robot.framed.write_message("hello").unwrap();
        let err = decision.receive().unwrap_err();
        assert!(matches!(err, ChannelError::Wire(WireError::NotNumeric(_))));
        let err: ts_common::Error = err.into();
        assert_eq!(err.category(), ts_common::ErrorCategory::Protocol);
    }

    #[test]
    fn connect_failure_is_communication_error() {
        // bind then drop to get a port nobody listens on
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let err = RobotLink::connect(&format!("127.0.0.1:{port}"), TIMEOUT).unwrap_err();
        assert!(matches!(err, ChannelError::Connect { .. }));
        let err: ts_common::Error = err.into();
        assert_eq!(err.category(), ts_common::ErrorCategory::Communication);
    }
}
