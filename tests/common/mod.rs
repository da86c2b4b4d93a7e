//! Shared fixtures: a scripted HTTP transport and a small zip writer.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use xray_export::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Canned outcome for one request.
pub enum Reply {
    Status(u16, Vec<u8>),
    Fail(&'static str),
}

/// Transport that answers from a script and records every request.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request");

        match reply {
            Reply::Status(code, body) => Ok(HttpResponse {
                status: StatusCode::from_u16(code).unwrap(),
                headers: HeaderMap::new(),
                body: Box::new(Cursor::new(body)),
            }),
            Reply::Fail(message) => Err(std::io::Error::other(message).into()),
        }
    }
}

/// How an entry is stored.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Stored,
    Deflate,
    /// DEFLATE with sizes and CRC moved to a trailing data descriptor
    DeflateStreamed,
}

struct Written {
    name: String,
    method: u16,
    flags: u16,
    crc: u32,
    compressed: u32,
    uncompressed: u32,
    offset: u32,
}

/// Minimal zip writer for test archives, including hostile ones.
#[derive(Default)]
pub struct ZipFixture {
    data: Vec<u8>,
    entries: Vec<Written>,
}

impl ZipFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(self, name: &str) -> Self {
        self.entry(name, b"", Method::Stored)
    }

    pub fn file(self, name: &str, content: &[u8]) -> Self {
        self.entry(name, content, Method::Deflate)
    }

    pub fn entry(mut self, name: &str, content: &[u8], method: Method) -> Self {
        let mut crc = flate2::Crc::new();
        crc.update(content);
        let crc = crc.sum();

        let payload = match method {
            Method::Stored => content.to_vec(),
            Method::Deflate | Method::DeflateStreamed => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(content).unwrap();
                encoder.finish().unwrap()
            }
        };
        let (method_id, flags) = match method {
            Method::Stored => (0u16, 0u16),
            Method::Deflate => (8, 0),
            Method::DeflateStreamed => (8, 0x0008),
        };
        let streamed = method == Method::DeflateStreamed;

        let offset = self.data.len() as u32;
        let out = &mut self.data;
        out.extend_from_slice(b"PK\x03\x04");
        out.write_u16::<LittleEndian>(20).unwrap();
        out.write_u16::<LittleEndian>(flags).unwrap();
        out.write_u16::<LittleEndian>(method_id).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0x5A21).unwrap();
        out.write_u32::<LittleEndian>(if streamed { 0 } else { crc }).unwrap();
        out.write_u32::<LittleEndian>(if streamed { 0 } else { payload.len() as u32 })
            .unwrap();
        out.write_u32::<LittleEndian>(if streamed { 0 } else { content.len() as u32 })
            .unwrap();
        out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&payload);

        if streamed {
            out.extend_from_slice(b"PK\x07\x08");
            out.write_u32::<LittleEndian>(crc).unwrap();
            out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(content.len() as u32).unwrap();
        }

        self.entries.push(Written {
            name: name.to_string(),
            method: method_id,
            flags,
            crc,
            compressed: payload.len() as u32,
            uncompressed: content.len() as u32,
            offset,
        });
        self
    }

    /// Local entries only, as if the stream was cut before the central directory.
    pub fn truncated(self) -> Vec<u8> {
        self.data
    }

    pub fn finish(mut self) -> Vec<u8> {
        let cd_offset = self.data.len() as u32;
        let out = &mut self.data;

        for e in &self.entries {
            out.extend_from_slice(b"PK\x01\x02");
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(e.flags).unwrap();
            out.write_u16::<LittleEndian>(e.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0x5A21).unwrap();
            out.write_u32::<LittleEndian>(e.crc).unwrap();
            out.write_u32::<LittleEndian>(e.compressed).unwrap();
            out.write_u32::<LittleEndian>(e.uncompressed).unwrap();
            out.write_u16::<LittleEndian>(e.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(e.offset).unwrap();
            out.extend_from_slice(e.name.as_bytes());
        }

        let cd_size = out.len() as u32 - cd_offset;
        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();

        self.data
    }
}
