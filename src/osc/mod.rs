//! OSC output
//!
//! Sends the per-frame gesture values as individual OSC messages over UDP.
//! Delivery is fire-and-forget: a failed send is logged and the frame moves on.

use std::net::{SocketAddr, UdpSocket};

use rosc::{encoder, OscMessage, OscPacket, OscType};

use crate::error::{GestureError, Result};
use crate::gesture::FrameOutput;

pub const ADDR_HAND_X: &str = "/hand/x";
pub const ADDR_HAND_Y: &str = "/hand/y";
pub const ADDR_GESTURE_ACTIVE: &str = "/gesture/active";
pub const ADDR_GESTURE_TRIGGER: &str = "/gesture/trigger";

/// Destination for per-frame output
pub trait OutputSink {
    fn send(&mut self, output: &FrameOutput) -> Result<()>;
}

/// Build the four messages for a frame, in send order
pub fn frame_messages(output: &FrameOutput) -> [OscMessage; 4] {
    [
        message(ADDR_HAND_X, OscType::Float(output.x)),
        message(ADDR_HAND_Y, OscType::Float(output.y)),
        message(ADDR_GESTURE_ACTIVE, OscType::Int(output.gesture_active as i32)),
        message(ADDR_GESTURE_TRIGGER, OscType::Int(output.trigger as i32)),
    ]
}

fn message(addr: &str, arg: OscType) -> OscMessage {
    OscMessage {
        addr: addr.to_string(),
        args: vec![arg],
    }
}

/// UDP OSC client
pub struct OscSender {
    socket: UdpSocket,
    target: SocketAddr,
    packets_sent: u64,
    send_errors: u64,
}

impl OscSender {
    /// Bind an ephemeral local socket for sending to `target`
    pub fn new(target: SocketAddr) -> Result<Self> {
        let bind_addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)?;
        log::info!("OSC output to {} (local {})", target, socket.local_addr()?);
        Ok(Self {
            socket,
            target,
            packets_sent: 0,
            send_errors: 0,
        })
    }

    /// Messages successfully handed to the socket
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn send_errors(&self) -> u64 {
        self.send_errors
    }

    fn send_message(&mut self, msg: OscMessage) -> Result<()> {
        let addr = msg.addr.clone();
        let data = encoder::encode(&OscPacket::Message(msg))
            .map_err(|e| GestureError::OscEncode(format!("{}: {:?}", addr, e)))?;

        match self.socket.send_to(&data, self.target) {
            Ok(_) => self.packets_sent += 1,
            Err(e) => {
                self.send_errors += 1;
                log::debug!("OSC send to {} failed ({}): {}", self.target, addr, e);
            }
        }
        Ok(())
    }
}

impl OutputSink for OscSender {
    fn send(&mut self, output: &FrameOutput) -> Result<()> {
        for msg in frame_messages(output) {
            self.send_message(msg)?;
        }
        Ok(())
    }
}

impl Drop for OscSender {
    fn drop(&mut self) {
        log::info!(
            "OSC output to {} closed: {} messages sent, {} failed",
            self.target,
            self.packets_sent,
            self.send_errors
        );
    }
}
