//! Positional reads over a record-addressed container.
//!
//! Reads never move a shared cursor, so one open handle can serve several
//! threads without an external lock around seek+read.

use std::fs::File;
use std::io;

pub trait RecordSource {
    /// Fill `buffer` with the bytes starting at absolute `offset`.
    fn read_exact_at(&self, offset: u64, buffer: &mut [u8]) -> io::Result<()>;

    /// Total number of readable bytes.
    fn byte_len(&self) -> io::Result<u64>;
}

impl RecordSource for File {
    fn byte_len(&self) -> io::Result<u64> {
        self.metadata().map(|metadata| metadata.len())
    }

    #[cfg(unix)]
    fn read_exact_at(&self, offset: u64, buffer: &mut [u8]) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buffer, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, offset: u64, buffer: &mut [u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        let mut filled = 0;
        while filled < buffer.len() {
            let read = self.seek_read(&mut buffer[filled..], offset + filled as u64)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            filled += read;
        }
        Ok(())
    }
}

impl RecordSource for [u8] {
    fn read_exact_at(&self, offset: u64, buffer: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset overflows usize"))?;
        let end = start
            .checked_add(buffer.len())
            .filter(|end| *end <= self.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "read of {} bytes at offset {} exceeds source length {}",
                        buffer.len(),
                        start,
                        self.len()
                    ),
                )
            })?;
        buffer.copy_from_slice(&self[start..end]);
        Ok(())
    }

    fn byte_len(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

impl RecordSource for Vec<u8> {
    fn read_exact_at(&self, offset: u64, buffer: &mut [u8]) -> io::Result<()> {
        self.as_slice().read_exact_at(offset, buffer)
    }

    fn byte_len(&self) -> io::Result<u64> {
        self.as_slice().byte_len()
    }
}

impl<T: RecordSource + ?Sized> RecordSource for &T {
    fn read_exact_at(&self, offset: u64, buffer: &mut [u8]) -> io::Result<()> {
        (**self).read_exact_at(offset, buffer)
    }

    fn byte_len(&self) -> io::Result<u64> {
        (**self).byte_len()
    }
}

/// Read `count` little-endian f64 values starting at `offset`.
pub fn read_f64_values<S: RecordSource + ?Sized>(
    source: &S,
    offset: u64,
    count: usize,
) -> io::Result<Vec<f64>> {
    let mut bytes = vec![0_u8; count * 8];
    source.read_exact_at(offset, &mut bytes)?;
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0_u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}

/// Read `count` little-endian f32 values starting at `offset`.
pub fn read_f32_values<S: RecordSource + ?Sized>(
    source: &S,
    offset: u64,
    count: usize,
) -> io::Result<Vec<f32>> {
    let mut bytes = vec![0_u8; count * 4];
    source.read_exact_at(offset, &mut bytes)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| {
            let mut raw = [0_u8; 4];
            raw.copy_from_slice(chunk);
            f32::from_le_bytes(raw)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{read_f32_values, read_f64_values, RecordSource};
    use std::io::{ErrorKind, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn slice_reads_are_positional() {
        let bytes: Vec<u8> = (0_u8..16).collect();
        let mut buffer = [0_u8; 4];
        bytes.read_exact_at(6, &mut buffer).expect("in-range read");
        assert_eq!(buffer, [6, 7, 8, 9]);
        bytes.read_exact_at(0, &mut buffer).expect("in-range read");
        assert_eq!(buffer, [0, 1, 2, 3]);
        assert_eq!(bytes.byte_len().expect("slice length"), 16);
    }

    #[test]
    fn short_reads_fail_with_unexpected_eof() {
        let bytes = vec![0_u8; 10];
        let mut buffer = [0_u8; 4];
        let error = bytes
            .read_exact_at(8, &mut buffer)
            .expect_err("read past end should fail");
        assert_eq!(error.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn float_helpers_decode_little_endian() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5_f64.to_le_bytes());
        bytes.extend_from_slice(&(-2.25_f64).to_le_bytes());
        bytes.extend_from_slice(&0.5_f32.to_le_bytes());
        bytes.extend_from_slice(&8.0_f32.to_le_bytes());

        assert_eq!(read_f64_values(&bytes, 0, 2).expect("f64 values"), vec![1.5, -2.25]);
        assert_eq!(read_f32_values(&bytes, 16, 2).expect("f32 values"), vec![0.5, 8.0]);
    }

    #[test]
    fn files_support_positional_reads() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&[9, 8, 7, 6, 5, 4]).expect("write bytes");
        file.flush().expect("flush");

        let handle = file.reopen().expect("reopen");
        let mut buffer = [0_u8; 2];
        handle.read_exact_at(3, &mut buffer).expect("file read");
        assert_eq!(buffer, [6, 5]);
        assert_eq!(handle.byte_len().expect("file length"), 6);
    }
}
