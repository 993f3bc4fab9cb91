//! Record reader for the BIFF8 stream inside an Excel 97-2003 workbook.

use crate::error::ContactsError;
use crate::helpers::string::to_f64;
use crate::helpers::string::to_u16;
use crate::helpers::string::to_u32;
use crate::helpers::string::to_u64;
use crate::helpers::string::to_usize;
use encoding_rs::UTF_16LE;
use std::ops::Range;
use thiserror::Error;

const CONTINUE: u16 = 60;

#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining")]
    NoEnoughDataError(usize),
}

/// Cursor over BIFF8 records. A record and the CONTINUE records following
/// it are read as one body.
pub(crate) struct Biff8Reader {
    buffer: Vec<u8>,
    pointer: usize, // Next record position in buffer
    chunks: Vec<(usize, usize)>, // Current record chunks (start, end)
    index: usize,  // Current chunk index
    offset: usize, // Offset within current chunk
    scratch: Vec<u8>, // Reads that straddle two chunks are assembled here
}

impl Biff8Reader {
    pub(crate) fn new(data: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            buffer: data,
            pointer: 0,
            chunks: Vec::new(),
            index: 0,
            offset: 0,
            scratch: Vec::with_capacity(8),
        }
    }

    /// Advances to the next record and returns its type, or `None` past the
    /// last complete header.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, ContactsError> {
        if self.pointer + 4 > self.buffer.len() {
            return Ok(None);
        }
        self.index = 0;
        self.offset = 0;
        self.chunks.clear();

        let kind = self.get_u16_at(self.pointer)?;
        self.push_chunk()?;
        while self.pointer + 4 <= self.buffer.len() && self.get_u16_at(self.pointer)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    /// Registers the record body at the pointer and moves past it
    fn push_chunk(&mut self) -> Result<(), ContactsError> {
        let size = self.get_u16_at(self.pointer + 2)? as usize;
        let lower = self.pointer + 4;
        let upper = self.buffer.len().min(lower + size);
        self.pointer = lower + size;
        self.chunks.push((lower, upper));
        Ok(())
    }

    /// Moves to the record header at `pointer`, as found in BOUNDSHEET8.
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
    }

    /// Takes up to `length` bytes from the current chunk
    fn take(&mut self, length: usize) -> Range<usize> {
        while let Some((lower, upper)) = self.chunks.get(self.index).copied() {
            let source = lower + self.offset;
            if source >= upper {
                self.index += 1;
                self.offset = 0;
                continue;
            }
            let target = upper.min(source + length);
            if target == upper {
                self.index += 1;
                self.offset = 0;
            } else {
                self.offset += target - source;
            }
            return source..target;
        }
        0..0
    }

    /// Reads exactly `length` bytes, crossing into CONTINUE chunks if needed
    fn read_extract(&mut self, length: usize) -> Result<&[u8], ContactsError> {
        self.scratch.clear();
        while self.scratch.len() < length {
            let range = self.take(length - self.scratch.len());
            if range.is_empty() {
                Err(Biff8Error::NoEnoughDataError(length))?
            }
            self.scratch.extend_from_slice(&self.buffer[range]);
        }
        Ok(&self.scratch)
    }

    /// Skips `length` bytes of the current record
    pub(crate) fn skip(&mut self, length: usize) -> Result<(), ContactsError> {
        self.read_extract(length).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ContactsError> {
        self.read_extract(1).map(|data| data[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ContactsError> {
        self.read_extract(2).map(to_u16)
    }

    /// Gets a 16-bit unsigned integer `offset` bytes before the end of the record
    pub(crate) fn get_u16_back(&self, offset: usize) -> Result<u16, ContactsError> {
        let mut offset = offset;
        for (lower, upper) in self.chunks.iter().rev() {
            let size = upper - lower;
            if offset <= size {
                return self.get_u16_at(upper - offset);
            }
            offset -= size;
        }
        Err(Biff8Error::NoEnoughDataError(2))?
    }

    fn get_u16_at(&self, index: usize) -> Result<u16, ContactsError> {
        match self.buffer.get(index..index + 2) {
            Some(bytes) => Ok(to_u16(bytes)),
            None => Err(Biff8Error::NoEnoughDataError(2))?,
        }
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ContactsError> {
        self.read_extract(4).map(to_u32)
    }

    /// Little-endian u32 widened to usize.
    pub(crate) fn read_usize(&mut self) -> Result<usize, ContactsError> {
        self.read_extract(4).map(to_usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, ContactsError> {
        self.read_extract(8).map(to_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, ContactsError> {
        self.read_extract(8).map(to_f64)
    }

    /// Decodes an RK value: a 30 bit integer or the high bits of a double,
    /// optionally scaled by 1/100.
    pub(crate) fn read_rk_number(&mut self) -> Result<String, ContactsError> {
        let rk = self.read_u32()?;
        let number = match rk & 0x02 {
            0 => f64::from_bits(u64::from(rk & !0x03) << 32),
            _ => f64::from((rk as i32) >> 2),
        };
        let number = if rk & 0x01 == 0 { number } else { number / 100.0 };
        Ok(number.to_string())
    }

    /// ShortXLUnicodeString: one byte character count.
    pub(crate) fn read_short_string(&mut self) -> Result<String, ContactsError> {
        let length = usize::from(self.read_u8()?);
        self.read_string_body(length)
    }

    /// XLUnicodeString: two byte character count.
    pub(crate) fn read_string(&mut self) -> Result<String, ContactsError> {
        let length = usize::from(self.read_u16()?);
        self.read_string_body(length)
    }

    fn read_string_body(&mut self, length: usize) -> Result<String, ContactsError> {
        let mut string = String::new();
        let options = StringOptions::from(self.read_u8()?);
        self.read_characters(options, length, &mut string);
        Ok(string)
    }

    /// XLUnicodeRichExtendedString as stored in the shared string table.
    ///
    /// The text may run on into CONTINUE records. Each continuation starts
    /// with a fresh option byte, since the character width can change there.
    /// Formatting runs and phonetic data follow the text and are skipped.
    pub(crate) fn read_rich_string(&mut self) -> Result<String, ContactsError> {
        let mut remaining = usize::from(self.read_u16()?);
        let options = StringOptions::from(self.read_u8()?);
        let runs = if options.has_runs { usize::from(self.read_u16()?) } else { 0 };
        let phonetic_size = if options.has_phonetic { self.read_usize()? } else { 0 };

        let mut string = String::new();
        remaining -= self.read_characters(options, remaining, &mut string).min(remaining);
        while remaining > 0 {
            let options = StringOptions::from(self.read_u8()?);
            match self.read_characters(options, remaining, &mut string) {
                0 => Err(Biff8Error::NoEnoughDataError(remaining))?,
                read => remaining -= read.min(remaining),
            }
        }

        self.skip(4 * runs)?;
        self.skip(phonetic_size)?;
        Ok(string)
    }

    /// Appends up to `length` characters from the current chunk and returns
    /// how many were read.
    fn read_characters(&mut self, options: StringOptions, length: usize, string: &mut String) -> usize {
        let width = if options.is_wide { 2 } else { 1 };
        let range = self.take(length * width);
        let bytes = &self.buffer[range];
        if options.is_wide {
            string.push_str(&UTF_16LE.decode(bytes).0);
        } else {
            // Compressed: the low byte of each UTF-16 unit
            string.extend(bytes.iter().copied().map(char::from));
        }
        bytes.len() / width
    }
}

/// Option byte at the start of BIFF8 string data.
#[derive(Copy, Clone)]
struct StringOptions {
    is_wide: bool,
    has_phonetic: bool,
    has_runs: bool,
}

impl From<u8> for StringOptions {
    fn from(flags: u8) -> Self {
        StringOptions {
            is_wide: flags & 0x01 != 0,
            has_phonetic: flags & 0x04 != 0,
            has_runs: flags & 0x08 != 0,
        }
    }
}

#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}
