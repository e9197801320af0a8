use crate::{error::Stage, Result, XcfParseError};
use byteorder::{BigEndian, ReadBytesExt};
#[cfg(test)]
use std::io::Cursor;
use std::io::{self, Read, Seek, SeekFrom};

pub(crate) struct XcfReader<T: Read> {
    input: T,
    stage: Stage,
}

#[cfg(test)]
impl XcfReader<Cursor<&[u8]>> {
    pub(crate) fn new(data: &[u8]) -> XcfReader<Cursor<&[u8]>> {
        let input = Cursor::new(data);
        XcfReader {
            input,
            stage: Stage::Header,
        }
    }
}

impl<T> XcfReader<T>
where
    T: Read,
{
    pub(crate) fn with(input: T) -> Self {
        Self {
            input,
            stage: Stage::Header,
        }
    }

    /// Subsequent I/O errors are reported as happening in `stage`.
    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    fn fail(&self, err: io::Error) -> XcfParseError {
        XcfParseError::io(self.stage, err)
    }

    pub(crate) fn byte(&mut self) -> Result<u8> {
        self.input.read_u8().map_err(|e| self.fail(e))
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        self.input.read_u16::<BigEndian>().map_err(|e| self.fail(e))
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        self.input.read_u32::<BigEndian>().map_err(|e| self.fail(e))
    }

    pub(crate) fn long(&mut self) -> Result<i32> {
        self.input.read_i32::<BigEndian>().map_err(|e| self.fail(e))
    }

    /// A stream offset. Offsets are absolute, counted from the first byte of
    /// the file.
    pub(crate) fn pointer(&mut self) -> Result<u32> {
        self.dword()
    }

    /// Reads pointers up to and including a zero sentinel. The sentinel is
    /// not part of the result.
    pub(crate) fn pointer_list(&mut self) -> Result<Vec<u32>> {
        let mut pointers = Vec::new();
        loop {
            let ptr = self.pointer()?;
            if ptr == 0 {
                return Ok(pointers);
            }
            pointers.push(ptr);
        }
    }

    pub(crate) fn string(&mut self) -> Result<String> {
        let str_len = self.dword()?;
        // The empty string is a bare zero length with no terminator.
        if str_len == 0 {
            return Ok(String::new());
        }
        let mut str_bytes = self.take_bytes(str_len as usize)?;
        // Drop the zero terminator, which is included in the length.
        str_bytes.pop();
        let s = String::from_utf8(str_bytes)?;
        Ok(s)
    }

    pub(crate) fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.input.read_exact(buffer).map_err(|e| self.fail(e))
    }

    pub(crate) fn skip(&mut self, count: u64) -> Result<()> {
        let mut limited = (&mut self.input).take(count);
        let copied = io::copy(&mut limited, &mut io::sink());
        let copied = copied.map_err(|e| self.fail(e))?;
        if copied != count {
            return Err(self.fail(unexpected_eof(count, copied)));
        }
        Ok(())
    }

    pub(crate) fn take_bytes(&mut self, limit: usize) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(limit.min(1 << 16));
        let read = (&mut self.input).take(limit as u64).read_to_end(&mut output);
        read.map_err(|e| self.fail(e))?;
        if output.len() != limit {
            Err(self.fail(unexpected_eof(limit as u64, output.len() as u64)))
        } else {
            Ok(output)
        }
    }
}

impl<T> XcfReader<T>
where
    T: Read + Seek,
{
    /// Moves the cursor to an absolute stream offset.
    pub(crate) fn seek(&mut self, offset: u32) -> Result<()> {
        self.input
            .seek(SeekFrom::Start(offset as u64))
            .map(|_| ())
            .map_err(|e| self.fail(e))
    }
}

fn unexpected_eof(expected: u64, actual: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!(
            "Input ended early. Expected: {} bytes, Actual: {}",
            expected, actual
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_primitives() {
        let data = [0x12, 0x34, 0x56, 0x78, 0xFF, 0xFF, 0xFF, 0xFE, 0xAB];
        let mut reader = XcfReader::new(&data);
        assert_eq!(reader.dword().unwrap(), 0x1234_5678);
        assert_eq!(reader.long().unwrap(), -2);
        assert_eq!(reader.byte().unwrap(), 0xAB);
        assert!(reader.byte().is_err());
    }

    #[test]
    fn zero_length_string_reads_no_terminator() {
        let data = [0, 0, 0, 0, 0xAB];
        let mut reader = XcfReader::new(&data);
        assert_eq!(reader.string().unwrap(), "");
        assert_eq!(reader.byte().unwrap(), 0xAB);
    }

    #[test]
    fn length_one_string_reads_only_terminator() {
        let data = [0, 0, 0, 1, 0, 0xAB];
        let mut reader = XcfReader::new(&data);
        assert_eq!(reader.string().unwrap(), "");
        assert_eq!(reader.byte().unwrap(), 0xAB);
    }

    #[test]
    fn string_drops_terminator() {
        let data = [0, 0, 0, 6, b'L', b'a', b'y', b'e', b'r', 0];
        let mut reader = XcfReader::new(&data);
        assert_eq!(reader.string().unwrap(), "Layer");
    }

    #[test]
    fn truncated_string_is_io_error() {
        let data = [0, 0, 0x10, 0, b'a', b'b'];
        let mut reader = XcfReader::new(&data);
        reader.set_stage(Stage::Layer);
        match reader.string() {
            Err(XcfParseError::IoError { stage, source }) => {
                assert_eq!(stage, Stage::Layer);
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("Expected I/O error, got {:?}", other),
        }
    }

    #[test]
    fn pointer_list_stops_at_zero() {
        let data = [0, 0, 0, 9, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 7];
        let mut reader = XcfReader::new(&data);
        assert_eq!(reader.pointer_list().unwrap(), vec![9, 256]);
        assert_eq!(reader.dword().unwrap(), 7);
    }

    #[test]
    fn skip_past_end_fails() {
        let data = [1, 2, 3];
        let mut reader = XcfReader::new(&data);
        assert!(reader.skip(2).is_ok());
        assert!(reader.skip(2).is_err());
    }
}
