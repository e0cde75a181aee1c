//! Device bridge over JSON lines.
//!
//! A robot-side bridge process exposes the vendor SDK at
//! `robot.address:robot.port`. Each request is one JSON object per line:
//!
//! ```text
//! {"op":"move_to","joints":[...],"angles":[...],"speeds":[...]}
//! {"op":"say","text":"Moving down"}
//! {"op":"post_say","text":"Ooh"}
//! {"op":"read_touch"}
//! ```
//!
//! and each reply is `{"ok":true,"value":0.0}` or `{"ok":false,"error":"..."}`.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::device::{check_move, Actuator, DeviceError, SensorSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeRequest {
    MoveTo {
        joints: Vec<String>,
        angles: Vec<f64>,
        speeds: Vec<f64>,
    },
    Say {
        text: String,
    },
    PostSay {
        text: String,
    },
    ReadTouch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One JSON-lines connection to the bridge.
#[derive(Debug)]
pub struct BridgeConnection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl BridgeConnection {
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, DeviceError> {
        let bridge_err = |e: std::io::Error| DeviceError::Bridge(format!("{addr}: {e}"));
        let target = addr
            .to_socket_addrs()
            .map_err(bridge_err)?
            .next()
            .ok_or_else(|| DeviceError::Bridge(format!("{addr}: no address")))?;
        let stream = TcpStream::connect_timeout(&target, timeout).map_err(bridge_err)?;
        stream.set_read_timeout(Some(timeout)).map_err(bridge_err)?;
        stream.set_write_timeout(Some(timeout)).map_err(bridge_err)?;
        stream.set_nodelay(true).map_err(bridge_err)?;
        let reader = BufReader::new(stream.try_clone().map_err(bridge_err)?);
        Ok(BridgeConnection {
            reader,
            writer: stream,
        })
    }

    /// Send one request and wait for its reply. `ok: false` becomes an error.
    pub fn request(&mut self, req: &BridgeRequest) -> Result<BridgeResponse, DeviceError> {
        let line = serde_json::to_string(req)
            .map_err(|e| DeviceError::Bridge(format!("serialize: {e}")))?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| DeviceError::Bridge(format!("send: {e}")))?;

        let mut resp_line = String::new();
        let n = self
            .reader
            .read_line(&mut resp_line)
            .map_err(|e| DeviceError::Bridge(format!("recv: {e}")))?;
        if n == 0 {
            return Err(DeviceError::Bridge("bridge closed the connection".to_string()));
        }
        let resp: BridgeResponse = serde_json::from_str(&resp_line)
            .map_err(|e| DeviceError::Bridge(format!("parse response: {e}")))?;
        if !resp.ok {
            return Err(DeviceError::Bridge(
                resp.error.unwrap_or_else(|| "request refused".to_string()),
            ));
        }
        Ok(resp)
    }
}

/// [`Actuator`] backed by the bridge.
#[derive(Debug)]
pub struct BridgeActuator {
    conn: BridgeConnection,
}

impl BridgeActuator {
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, DeviceError> {
        Ok(BridgeActuator {
            conn: BridgeConnection::connect(addr, timeout)?,
        })
    }
}

impl Actuator for BridgeActuator {
    fn move_to(
        &mut self,
        joints: &[&str],
        angles: &[f64],
        speeds: &[f64],
    ) -> Result<(), DeviceError> {
        check_move(joints, angles, speeds)?;
        self.conn
            .request(&BridgeRequest::MoveTo {
                joints: joints.iter().map(|j| j.to_string()).collect(),
                angles: angles.to_vec(),
                speeds: speeds.to_vec(),
            })
            .map_err(|e| DeviceError::Motion(e.to_string()))?;
        Ok(())
    }

    fn say(&mut self, utterance: &str) -> Result<(), DeviceError> {
        self.conn
            .request(&BridgeRequest::Say {
                text: utterance.to_string(),
            })
            .map_err(|e| DeviceError::Speech(e.to_string()))?;
        Ok(())
    }

    fn post_say(&mut self, utterance: &str) -> Result<(), DeviceError> {
        self.conn
            .request(&BridgeRequest::PostSay {
                text: utterance.to_string(),
            })
            .map_err(|e| DeviceError::Speech(e.to_string()))?;
        Ok(())
    }
}

/// [`SensorSource`] backed by the bridge.
#[derive(Debug)]
pub struct BridgeSensor {
    conn: BridgeConnection,
}

impl BridgeSensor {
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self, DeviceError> {
        Ok(BridgeSensor {
            conn: BridgeConnection::connect(addr, timeout)?,
        })
    }
}

impl SensorSource for BridgeSensor {
    fn read_touch_intensity(&mut self) -> Result<f64, DeviceError> {
        let resp = self
            .conn
            .request(&BridgeRequest::ReadTouch)
            .map_err(|e| DeviceError::Sensor(e.to_string()))?;
        resp.value
            .filter(|v| v.is_finite())
            .ok_or_else(|| DeviceError::Sensor("reply carried no finite value".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// Minimal bridge: answers `read_touch` with 0.5, refuses `say`, accepts the rest.
    fn spawn_bridge() -> (String, thread::JoinHandle<Vec<BridgeRequest>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let reader = BufReader::new(stream);
            let mut seen = Vec::new();
            for line in reader.lines() {
                let Ok(line) = line else { break };
                let req: BridgeRequest = serde_json::from_str(&line).unwrap();
                let resp = match &req {
                    BridgeRequest::ReadTouch => BridgeResponse {
                        ok: true,
                        value: Some(0.5),
                        error: None,
                    },
                    BridgeRequest::Say { .. } => BridgeResponse {
                        ok: false,
                        value: None,
                        error: Some("tts busy".into()),
                    },
                    _ => BridgeResponse {
                        ok: true,
                        value: None,
                        error: None,
                    },
                };
                seen.push(req);
                let mut out = serde_json::to_string(&resp).unwrap();
                out.push('\n');
                writer.write_all(out.as_bytes()).unwrap();
            }
            seen
        });
        (addr, handle)
    }

    #[test]
    fn request_wire_format() {
        let json = serde_json::to_string(&BridgeRequest::ReadTouch).unwrap();
        assert_eq!(json, r#"{"op":"read_touch"}"#);
        let json = serde_json::to_value(BridgeRequest::PostSay { text: "Ooh".into() }).unwrap();
        assert_eq!(json["op"], "post_say");
    }

    #[test]
    fn actuator_round_trip_against_bridge() {
        let (addr, handle) = spawn_bridge();
        {
            let mut act = BridgeActuator::connect(&addr, Duration::from_secs(5)).unwrap();
            act.move_to(&["RShoulderPitch"], &[0.1], &[1.0]).unwrap();
            act.post_say("Ooh").unwrap();
            let err = act.say("Moving down").unwrap_err();
            assert!(matches!(err, DeviceError::Speech(msg) if msg.contains("tts busy")));
        }
        let seen = handle.join().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0], BridgeRequest::MoveTo { .. }));
    }

    #[test]
    fn sensor_reads_value() {
        let (addr, handle) = spawn_bridge();
        {
            let mut sensor = BridgeSensor::connect(&addr, Duration::from_secs(5)).unwrap();
            assert_eq!(sensor.read_touch_intensity().unwrap(), 0.5);
        }
        handle.join().unwrap();
    }

    #[test]
    fn connection_bounds_reads_and_writes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let timeout = Duration::from_millis(750);
        let conn = BridgeConnection::connect(&addr, timeout).unwrap();
        assert_eq!(conn.writer.write_timeout().unwrap(), Some(timeout));
        assert_eq!(conn.reader.get_ref().read_timeout().unwrap(), Some(timeout));
    }

    #[test]
    fn unreachable_bridge_is_a_device_error() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let err = BridgeActuator::connect(&format!("127.0.0.1:{port}"), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, DeviceError::Bridge(_)));
    }
}
