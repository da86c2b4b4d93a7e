//! Sequential ZIP archive reader.
//!
//! This module reads entries straight off a byte stream, the way the data
//! arrives from an HTTP response body.
//!
//! ## Parsing Strategy
//!
//! The Central Directory sits at the end of an archive, which a stream only
//! reaches after everything else. Instead, every entry is discovered through
//! its Local File Header:
//! 1. Read the 4-byte signature; a Central Directory or EOCD signature ends
//!    the entry sequence
//! 2. Read the fixed header, file name and extra field
//! 3. Decode the entry data through a bounded buffer, checking its CRC-32
//! 4. If flag bit 3 is set, read the trailing data descriptor
//!
//! DEFLATE streams are self-terminating, so entries whose sizes are deferred
//! to a data descriptor can still be read. STORED entries need their size up
//! front.

use flate2::{Crc, Decompress, FlushDecompress, Status};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::ExtractionError;

use super::structures::*;

/// Size of the read buffer in front of the byte stream.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Size of the inflate output buffer.
const INFLATE_BUFFER_SIZE: usize = 32 * 1024;

/// Streaming ZIP parser.
///
/// Call [`next_entry`](Self::next_entry) to advance and
/// [`copy_entry`](Self::copy_entry) to read the data of the entry just
/// returned. Data left unread is skipped on the next advance.
pub struct ZipStreamReader<R> {
    /// The underlying byte stream
    reader: BufReader<R>,
    /// Entry whose data has not been consumed yet
    pending: Option<ArchiveEntry>,
    /// Set once the Central Directory or EOCD has been reached
    finished: bool,
    /// Whether any record has been read
    started: bool,
}

impl<R: AsyncRead + Unpin> ZipStreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, reader),
            pending: None,
            finished: false,
            started: false,
        }
    }

    /// Advance to the next entry.
    ///
    /// Returns `None` once the Central Directory is reached.
    pub async fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, ExtractionError> {
        if let Some(entry) = self.pending.take() {
            self.read_data(&entry, &mut tokio::io::sink()).await?;
        }
        if self.finished {
            return Ok(None);
        }

        let mut sig = [0u8; 4];
        if let Err(e) = self.reader.read_exact(&mut sig).await {
            return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
                let what = if self.started {
                    "archive ends before the central directory"
                } else {
                    "empty archive stream"
                };
                ExtractionError::InvalidArchive(what.to_string())
            } else {
                e.into()
            });
        }
        self.started = true;

        match sig {
            LFH_SIGNATURE => {}
            CDFH_SIGNATURE | EOCD_SIGNATURE => {
                self.finished = true;
                return Ok(None);
            }
            _ => {
                return Err(ExtractionError::InvalidArchive(
                    "missing local file header signature".to_string(),
                ));
            }
        }

        let entry = self.read_local_header().await?;
        self.pending = Some(entry.clone());
        Ok(Some(entry))
    }

    /// Decode the data of the current entry into `out`.
    ///
    /// Returns the number of decompressed bytes written.
    pub async fn copy_entry<W>(&mut self, out: &mut W) -> Result<u64, ExtractionError>
    where
        W: AsyncWrite + Unpin,
    {
        match self.pending.take() {
            Some(entry) => self.read_data(&entry, out).await,
            None => Ok(0),
        }
    }

    async fn read_local_header(&mut self) -> Result<ArchiveEntry, ExtractionError> {
        let mut fixed = [0u8; LocalFileHeader::FIXED_SIZE];
        self.read_record(&mut fixed).await?;
        let header = LocalFileHeader::from_bytes(&fixed)?;

        // Read the variable-length file name
        let mut name_bytes = vec![0u8; header.file_name_length as usize];
        self.read_record(&mut name_bytes).await?;
        // Use lossy conversion to handle non-UTF8 filenames gracefully
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let mut extra = vec![0u8; header.extra_field_length as usize];
        self.read_record(&mut extra).await?;
        let zip64 = parse_zip64_extra(&extra, &header)?;

        if header.is_encrypted() {
            return Err(unsupported(&name, "encrypted entries are not supported"));
        }
        match header.compression_method {
            CompressionMethod::Stored if header.has_data_descriptor() => {
                return Err(unsupported(
                    &name,
                    "STORED entries with a data descriptor cannot be streamed",
                ));
            }
            CompressionMethod::Stored | CompressionMethod::Deflate => {}
            CompressionMethod::Unknown(_) => {
                return Err(unsupported(
                    &name,
                    &format!(
                        "compression method {} is not supported",
                        header.compression_method.as_u16()
                    ),
                ));
            }
        }

        let (compressed_size, declared_size) = if header.has_data_descriptor() {
            (None, None)
        } else {
            let sizes = zip64.unwrap_or_default();
            (
                Some(sizes.compressed_size.unwrap_or(header.compressed_size as u64)),
                Some(sizes.uncompressed_size.unwrap_or(header.uncompressed_size as u64)),
            )
        };

        Ok(ArchiveEntry {
            is_directory: name.ends_with('/'),
            name,
            method: header.compression_method,
            flags: header.flags,
            crc32: header.crc32,
            compressed_size,
            declared_size,
            zip64: zip64.is_some(),
        })
    }

    async fn read_data<W>(&mut self, entry: &ArchiveEntry, out: &mut W) -> Result<u64, ExtractionError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut crc = Crc::new();
        let written = match entry.method {
            CompressionMethod::Deflate => self.inflate(entry, &mut crc, out).await?,
            _ => self.copy_stored(entry, &mut crc, out).await?,
        };
        out.flush().await?;

        let expected_crc = if entry.has_data_descriptor() {
            self.read_data_descriptor(entry.zip64).await?
        } else {
            entry.crc32
        };
        if crc.sum() != expected_crc {
            return Err(ExtractionError::InvalidArchive(format!(
                "CRC-32 mismatch for entry {}",
                entry.name
            )));
        }

        Ok(written)
    }

    async fn copy_stored<W>(
        &mut self,
        entry: &ArchiveEntry,
        crc: &mut Crc,
        out: &mut W,
    ) -> Result<u64, ExtractionError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut remaining = entry.compressed_size.unwrap_or(0);
        let mut written = 0u64;

        while remaining > 0 {
            let input = self.reader.fill_buf().await?;
            if input.is_empty() {
                return Err(truncated(&entry.name));
            }
            // `remaining` may exceed usize on 32-bit targets
            let n = input.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
            crc.update(&input[..n]);
            out.write_all(&input[..n]).await?;
            self.reader.consume(n);

            remaining -= n as u64;
            written += n as u64;
        }

        Ok(written)
    }

    async fn inflate<W>(
        &mut self,
        entry: &ArchiveEntry,
        crc: &mut Crc,
        out: &mut W,
    ) -> Result<u64, ExtractionError>
    where
        W: AsyncWrite + Unpin,
    {
        // Raw DEFLATE, no zlib header
        let mut decoder = Decompress::new(false);
        let mut output = vec![0u8; INFLATE_BUFFER_SIZE];

        loop {
            let input = self.reader.fill_buf().await?;
            let at_eof = input.is_empty();
            let flush = if at_eof {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };

            let before_in = decoder.total_in();
            let before_out = decoder.total_out();
            let status = decoder
                .decompress(input, &mut output, flush)
                .map_err(|e| {
                    ExtractionError::InvalidArchive(format!("corrupt entry {}: {e}", entry.name))
                })?;
            let consumed = (decoder.total_in() - before_in) as usize;
            let produced = (decoder.total_out() - before_out) as usize;
            self.reader.consume(consumed);

            if produced > 0 {
                crc.update(&output[..produced]);
                out.write_all(&output[..produced]).await?;
            }

            if status == Status::StreamEnd {
                break;
            }
            if consumed == 0 && produced == 0 {
                // No progress: either the stream ended early or the data is garbage
                return Err(if at_eof {
                    truncated(&entry.name)
                } else {
                    ExtractionError::InvalidArchive(format!(
                        "corrupt entry {}: deflate stream stalled",
                        entry.name
                    ))
                });
            }
        }

        if let Some(expected) = entry.compressed_size {
            if decoder.total_in() != expected {
                return Err(ExtractionError::InvalidArchive(format!(
                    "entry {} declares {expected} compressed bytes but used {}",
                    entry.name,
                    decoder.total_in()
                )));
            }
        }

        Ok(decoder.total_out())
    }

    /// Read the descriptor following deferred-size data and return its CRC.
    async fn read_data_descriptor(&mut self, zip64: bool) -> Result<u32, ExtractionError> {
        let mut first = [0u8; 4];
        self.read_record(&mut first).await?;

        let crc32 = if first == DATA_DESCRIPTOR_SIGNATURE {
            let mut crc = [0u8; 4];
            self.read_record(&mut crc).await?;
            u32::from_le_bytes(crc)
        } else {
            u32::from_le_bytes(first)
        };

        // Sizes are untrusted and the decoder already knows them
        let sizes_len = if zip64 { 16 } else { 8 };
        let mut sizes = [0u8; 16];
        self.read_record(&mut sizes[..sizes_len]).await?;

        Ok(crc32)
    }

    async fn read_record(&mut self, buf: &mut [u8]) -> Result<(), ExtractionError> {
        match self.reader.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(
                ExtractionError::InvalidArchive("truncated entry header".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }
}

fn unsupported(name: &str, reason: &str) -> ExtractionError {
    ExtractionError::UnsupportedEntry {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn truncated(name: &str) -> ExtractionError {
    ExtractionError::InvalidArchive(format!("archive ends inside entry {name}"))
}
