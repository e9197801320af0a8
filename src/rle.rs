use crate::{reader::XcfReader, Result, XcfParseError};
use std::io::Read;

// From the XCF documentation, each opcode byte is followed by:
// 0..=126:   one value byte, repeated op + 1 times.
// 127:       a 16 bit count and one value byte, repeated count times.
// 128:       a 16 bit count and count bytes, copied verbatim.
// 129..=255: 256 - op bytes, copied verbatim.
enum Run {
    Repeat(u8),
    Literal,
}

/// Fills `dest` completely from the run-length encoded stream. The stream is
/// consumed exactly up to the last opcode needed.
pub(crate) fn decode_rle<R: Read>(reader: &mut XcfReader<R>, dest: &mut [u8]) -> Result<()> {
    let total = dest.len();
    let mut next = 0;

    while next < total {
        let op = reader.byte()?;
        let (count, run) = match op {
            0..=126 => (op as usize + 1, Run::Repeat(reader.byte()?)),
            127 => {
                let count = reader.word()? as usize;
                (count, Run::Repeat(reader.byte()?))
            }
            128 => (reader.word()? as usize, Run::Literal),
            129..=255 => (256 - op as usize, Run::Literal),
        };

        let target = dest.get_mut(next..next + count).ok_or_else(|| {
            XcfParseError::InvalidInput(format!(
                "RLE run of {} bytes at offset {} overflows tile of {} bytes",
                count, next, total
            ))
        })?;
        match run {
            Run::Repeat(value) => {
                for byte in target.iter_mut() {
                    *byte = value;
                }
            }
            Run::Literal => reader.read_exact(target)?,
        }
        next += count;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::encode_rle;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn decode(encoded: &[u8], size: usize) -> Result<Vec<u8>> {
        let mut reader = XcfReader::new(encoded);
        let mut dest = vec![0_u8; size];
        decode_rle(&mut reader, &mut dest).map(|_| dest)
    }

    #[test]
    fn short_repeat() {
        assert_eq!(decode(&[0x04, 0xAA], 5).unwrap(), vec![0xAA; 5]);
        assert_eq!(decode(&[0x05, 0xAA], 6).unwrap(), vec![0xAA; 6]);
        assert_eq!(decode(&[0x00, 0x17], 1).unwrap(), vec![0x17]);
    }

    #[test]
    fn short_literal() {
        assert_eq!(decode(&[0xFF, 0x42], 1).unwrap(), vec![0x42]);
        assert_eq!(decode(&[0xFD, 1, 2, 3], 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn long_repeat() {
        assert_eq!(decode(&[127, 0x00, 0x03, 0x09], 3).unwrap(), vec![0x09; 3]);
        assert_eq!(decode(&[127, 0x01, 0x00, 0x01], 256).unwrap(), vec![1; 256]);
    }

    #[test]
    fn long_literal() {
        assert_eq!(
            decode(&[128, 0x00, 0x02, 0x11, 0x22], 2).unwrap(),
            vec![0x11, 0x22]
        );
    }

    #[test]
    fn mixed_opcodes() {
        let encoded = [0x01, 7, 0xFE, 8, 9, 127, 0, 2, 5, 128, 0, 1, 6];
        assert_eq!(decode(&encoded, 7).unwrap(), vec![7, 7, 8, 9, 5, 5, 6]);
    }

    #[test]
    fn stops_at_requested_size() {
        let mut reader = XcfReader::new(&[0x01, 3, 0xAB]);
        let mut dest = [0_u8; 2];
        decode_rle(&mut reader, &mut dest).unwrap();
        assert_eq!(dest, [3, 3]);
        assert_eq!(reader.byte().unwrap(), 0xAB);
    }

    #[test]
    fn truncated_stream_fails() {
        assert!(decode(&[0x04, 0xAA], 8).is_err());
        assert!(decode(&[0xFC, 1, 2], 4).is_err());
        assert!(decode(&[127, 0], 4).is_err());
        assert!(decode(&[], 1).is_err());
    }

    #[test]
    fn overshooting_run_is_rejected() {
        match decode(&[0x09, 0xAA], 4) {
            Err(err) => assert!(err.is_format_error()),
            Ok(data) => panic!("Expected error, decoded {:?}", data),
        }
    }

    #[test]
    fn randomized_tiles() {
        let mut rng = StdRng::seed_from_u64(0x0dec_0de5);
        for _ in 0..50 {
            let len = 1 + (rng.gen::<u32>() % 20_000) as usize;
            let mut data = Vec::with_capacity(len);
            while data.len() < len {
                let value: u8 = rng.gen();
                let repeat = 1 + (rng.gen::<u32>() % 300) as usize;
                let repeat = repeat.min(len - data.len());
                data.extend(std::iter::repeat(value).take(repeat));
            }
            let encoded = encode_rle(&data);
            assert_eq!(decode(&encoded, len).unwrap(), data);
        }
    }
}
