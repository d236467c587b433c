//! Seekable byte sources the decoder reads from.
//!
//! A short read is distinguishable from a clean end of data: reading at or past the end
//! returns [`SourceError::Eof`], reading a span that is only partially available returns
//! [`SourceError::UnexpectedEof`] (and leaves the cursor after the bytes that were read).

use crate::error::SourceError;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// The operations the decoder needs from its input.
pub trait ByteSource {
    /// Move the cursor, returning the new absolute offset.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, SourceError>;

    /// Fill `buf` from the cursor, advancing it.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), SourceError>;

    /// Fill `buf` from `offset` without moving the cursor.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), SourceError> {
        let saved = self.tell()?;
        self.seek(SeekFrom::Start(offset))?;
        let result = self.read(buf);
        self.seek(SeekFrom::Start(saved))?;
        result
    }

    fn tell(&mut self) -> Result<u64, SourceError>;

    /// Total length of the data in bytes.
    fn len(&mut self) -> Result<u64, SourceError>;

    fn is_empty(&mut self) -> Result<bool, SourceError> {
        Ok(self.len()? == 0)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, SourceError> {
        (**self).seek(pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        (**self).read(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), SourceError> {
        (**self).read_at(buf, offset)
    }

    fn tell(&mut self) -> Result<u64, SourceError> {
        (**self).tell()
    }

    fn len(&mut self) -> Result<u64, SourceError> {
        (**self).len()
    }
}

/// [`ByteSource`] over any `Read + Seek`: in-memory buffers, files, etc.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> ReaderSource<R> {
    /// Wrap `inner`, measuring its length. The cursor is left at the start.
    pub fn new(mut inner: R) -> Result<Self, SourceError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(ReaderSource { inner, len })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<T: AsRef<[u8]>> ReaderSource<Cursor<T>> {
    pub fn from_bytes(data: T) -> Self {
        let len = data.as_ref().len() as u64;
        ReaderSource {
            inner: Cursor::new(data),
            len,
        }
    }
}

impl ReaderSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        ReaderSource::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ByteSource for ReaderSource<R> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, SourceError> {
        Ok(self.inner.seek(pos)?)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        let wanted = buf.len();
        let mut got = 0;
        while got < wanted {
            match self.inner.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        match got {
            _ if got == wanted => Ok(()),
            0 => Err(SourceError::Eof),
            _ => Err(SourceError::UnexpectedEof { got, wanted }),
        }
    }

    fn tell(&mut self) -> Result<u64, SourceError> {
        Ok(self.inner.stream_position()?)
    }

    fn len(&mut self) -> Result<u64, SourceError> {
        Ok(self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_advances_cursor() {
        let mut src = ReaderSource::from_bytes(vec![1u8, 2, 3, 4]);
        let mut buf = [0u8; 3];
        src.read(&mut buf).expect("read");
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(src.tell().expect("tell"), 3);
    }

    #[test]
    fn read_at_end_is_eof() {
        let mut src = ReaderSource::from_bytes(vec![1u8]);
        src.seek(SeekFrom::Start(1)).expect("seek");
        let mut buf = [0u8; 1];
        assert!(matches!(src.read(&mut buf), Err(SourceError::Eof)));

        let mut empty = ReaderSource::from_bytes(Vec::<u8>::new());
        assert!(matches!(empty.read(&mut buf), Err(SourceError::Eof)));
    }

    #[test]
    fn short_read_is_unexpected_eof() {
        let mut src = ReaderSource::from_bytes(vec![1u8]);
        let mut buf = [0u8; 2];
        match src.read(&mut buf) {
            Err(SourceError::UnexpectedEof { got, wanted }) => {
                assert_eq!(got, 1);
                assert_eq!(wanted, 2);
            }
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[test]
    fn read_at_keeps_cursor() {
        let mut src = ReaderSource::from_bytes(b"abcdef".to_vec());
        src.seek(SeekFrom::Start(1)).expect("seek");
        let mut buf = [0u8; 2];
        src.read_at(&mut buf, 4).expect("read_at");
        assert_eq!(&buf, b"ef");
        assert_eq!(src.tell().expect("tell"), 1);

        // Failed positional reads still restore the cursor.
        let mut big = [0u8; 4];
        assert!(src.read_at(&mut big, 4).is_err());
        assert_eq!(src.tell().expect("tell"), 1);
    }

    #[test]
    fn file_source() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"\x01\x02\x03").expect("write");
        file.flush().expect("flush");

        let mut src = ReaderSource::open(file.path()).expect("open");
        assert_eq!(src.len().expect("len"), 3);
        let mut buf = [0u8; 2];
        src.read_at(&mut buf, 1).expect("read_at");
        assert_eq!(buf, [2, 3]);
        assert_eq!(src.tell().expect("tell"), 0);
    }
}
