//! Minimal telnet client for scripted command-line sessions.
//!
//! Option negotiation is refused outright and subnegotiation is skipped,
//! which is all APC network management cards require.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parse {
    Data,
    Command,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationCommand,
}

/// Connected session with a pending-output buffer.
pub(super) struct TelnetSession {
    stream: TcpStream,
    received: Vec<u8>,
    state: Parse,
    timeout: Duration,
}

impl TelnetSession {
    pub(super) fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let mut last_error = None;
        for address in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&address, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    return Ok(Self {
                        stream,
                        received: Vec::new(),
                        state: Parse::Data,
                        timeout,
                    });
                }
                Err(error) => last_error = Some(error),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no address for {host}"))
        }))
    }

    /// Reads until `marker` appears, discarding everything up to and
    /// including it.
    pub(super) fn read_until(&mut self, marker: &str) -> io::Result<()> {
        let deadline = Instant::now() + self.timeout;
        let needle = marker.as_bytes();
        let mut chunk = [0_u8; 512];
        loop {
            if let Some(end) = find(&self.received, needle) {
                self.received.drain(..end);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("timed out waiting for '{marker}'"),
                ));
            }
            let count = self.stream.read(&mut chunk)?;
            if count == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("connection closed before '{marker}'"),
                ));
            }
            self.absorb(chunk.get(..count).unwrap_or_default())?;
        }
    }

    pub(super) fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\r\n")?;
        self.stream.flush()
    }

    fn absorb(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &byte in bytes {
            self.state = match (self.state, byte) {
                (Parse::Data, IAC) => Parse::Command,
                (Parse::Data, _) => {
                    self.received.push(byte);
                    Parse::Data
                }
                (Parse::Command, IAC) => {
                    self.received.push(IAC);
                    Parse::Data
                }
                (Parse::Command, DO | DONT | WILL | WONT) => Parse::Negotiate(byte),
                (Parse::Command, SB) => Parse::Subnegotiation,
                (Parse::Command, _) => Parse::Data,
                (Parse::Negotiate(verb), option) => {
                    self.refuse(verb, option)?;
                    Parse::Data
                }
                (Parse::Subnegotiation, IAC) => Parse::SubnegotiationCommand,
                (Parse::Subnegotiation, _) => Parse::Subnegotiation,
                (Parse::SubnegotiationCommand, SE) => Parse::Data,
                (Parse::SubnegotiationCommand, _) => Parse::Subnegotiation,
            };
        }
        Ok(())
    }

    fn refuse(&mut self, verb: u8, option: u8) -> io::Result<()> {
        let reply = match verb {
            DO => WONT,
            WILL => DONT,
            _ => return Ok(()),
        };
        self.stream.write_all(&[IAC, reply, option])
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|start| start + needle.len())
}
