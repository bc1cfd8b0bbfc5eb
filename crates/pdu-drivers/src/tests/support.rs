//! Loopback stand-ins for PDU management interfaces.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);

fn accept(listener: &TcpListener) -> Result<Option<TcpStream>> {
    listener
        .set_nonblocking(true)
        .context("listener nonblocking")?;
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false).context("stream blocking")?;
                stream
                    .set_read_timeout(Some(ACCEPT_DEADLINE))
                    .context("stream read timeout")?;
                return Ok(Some(stream));
            }
            Err(ref error)
                if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(error) => return Err(error).context("accept connection"),
        }
    }
}

/// Address nothing is listening on.
pub(crate) fn closed_address() -> String {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe listener");
    let port = listener.local_addr().expect("probe address").port();
    drop(listener);
    format!("127.0.0.1:{port}")
}

/// Answers a single HTTP request with a canned status and body.
pub(crate) struct FakeHttpDevice {
    port: u16,
    request: Arc<Mutex<Option<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeHttpDevice {
    pub(crate) fn spawn(status: u16, body: &'static str) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake device")?;
        let port = listener.local_addr().context("local addr")?.port();
        let request = Arc::new(Mutex::new(None));
        let recorded = Arc::clone(&request);
        let handle = thread::spawn(move || {
            let Some(stream) = accept(&listener)? else {
                return Ok(());
            };
            Self::serve(stream, status, body, &recorded)
        });
        Ok(Self {
            port,
            request,
            handle: Some(handle),
        })
    }

    pub(crate) fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Waits for the exchange and returns the raw request text.
    pub(crate) fn take_request(mut self) -> Result<String> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake device thread panicked"))??;
        }
        self.request
            .lock()
            .map_err(|error| anyhow!("lock request: {error}"))?
            .take()
            .ok_or_else(|| anyhow!("no request received"))
    }

    fn serve(
        stream: TcpStream,
        status: u16,
        body: &str,
        recorded: &Mutex<Option<String>>,
    ) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
        let mut text = String::new();
        let mut content_length = 0_usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).context("read request head")? == 0 {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().context("content length")?;
                }
            }
            let blank = line == "\r\n";
            text.push_str(&line);
            if blank {
                break;
            }
        }
        let mut payload = vec![0_u8; content_length];
        reader.read_exact(&mut payload).context("read request body")?;
        text.push_str(&String::from_utf8_lossy(&payload));
        *recorded
            .lock()
            .map_err(|error| anyhow!("lock request: {error}"))? = Some(text);

        let mut writer = stream;
        write!(
            writer,
            "HTTP/1.1 {status} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .context("write response")?;
        writer.flush().context("flush response")
    }
}

impl Drop for FakeHttpDevice {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Plays the APC login dialogue and records every line the client sends.
pub(crate) struct FakeTelnetCard {
    port: u16,
    lines: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeTelnetCard {
    /// `reply` is written after the outlet command, then the card hangs up.
    pub(crate) fn spawn(reply: &'static str) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake card")?;
        let port = listener.local_addr().context("local addr")?.port();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&lines);
        let handle = thread::spawn(move || {
            let Some(stream) = accept(&listener)? else {
                return Ok(());
            };
            Self::converse(stream, reply, &recorded)
        });
        Ok(Self {
            port,
            lines,
            handle: Some(handle),
        })
    }

    pub(crate) const fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn take_lines(mut self) -> Result<Vec<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake card thread panicked"))??;
        }
        let lines = self
            .lines
            .lock()
            .map_err(|error| anyhow!("lock lines: {error}"))?;
        Ok(lines.clone())
    }

    fn converse(stream: TcpStream, reply: &str, recorded: &Mutex<Vec<String>>) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
        let mut writer = stream;
        // IAC DO ECHO, which the client must refuse.
        writer.write_all(&[255, 253, 1]).context("write negotiation")?;
        let dialogue = [
            "\r\nUser Name : ".to_owned(),
            "\r\nPassword  : ".to_owned(),
            "\r\nAmerican Power Conversion\r\nUse tcpip command to reconfigure\r\napc>".to_owned(),
            format!("\r\n{reply}\r\napc>"),
        ];
        let mut prompts = dialogue.iter();
        if let Some(first) = prompts.next() {
            writer.write_all(first.as_bytes()).context("write prompt")?;
        }
        for prompt in prompts {
            let mut raw = Vec::new();
            if reader.read_until(b'\n', &mut raw).context("read client line")? == 0 {
                return Ok(());
            }
            let line = strip_negotiation(&raw);
            recorded
                .lock()
                .map_err(|error| anyhow!("lock lines: {error}"))?
                .push(line);
            writer.write_all(prompt.as_bytes()).context("write prompt")?;
        }
        writer.flush().context("flush transcript")
    }
}

impl Drop for FakeTelnetCard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Drops three-byte IAC sequences and the line terminator.
fn strip_negotiation(raw: &[u8]) -> String {
    let mut text = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().copied();
    while let Some(byte) = bytes.next() {
        if byte == 255 {
            bytes.next();
            bytes.next();
            continue;
        }
        text.push(byte);
    }
    String::from_utf8_lossy(&text).trim_end().to_owned()
}
