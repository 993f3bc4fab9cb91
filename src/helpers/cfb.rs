//! Compound File Binary container, the OLE storage around `.xls` workbooks
//! and encrypted OOXML packages. Streams can be looked up and read by name;
//! storages and the red-black directory tree are not interpreted.

use crate::error::ContactsError;
use crate::helpers::string::to_u16;
use crate::helpers::string::to_u64;
use crate::helpers::string::to_usize;
use crate::helpers::string::to_usize_iter;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use thiserror::Error;

const HEADER_SIZE: usize = 512;
const DIRECTORY_SIZE: usize = 128;
const MINI_SECTOR_SIZE: usize = 64;
const MAX_REG_SECT: usize = 0xFFFFFFFB;

#[derive(Error, Debug)]
pub enum CfbError {
    #[error("Compound file is truncated")]
    FileFormatError,

    #[error("Invalid OLE signature (not an office document?)")]
    OleSignatureError,

    #[error("Sector shift '{1}' is not valid for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("Header declares {0} DIFAT sectors, found {1}")]
    DifatCountError(usize, usize),

    #[error("Header declares {0} FAT sectors, found {1}")]
    FatCountError(usize, usize),

    #[error("Sector '{0}' is outside of the file")]
    SectorRangeError(usize),

    #[error("Sector chain starting at '{0}' does not terminate")]
    SectorChainError(usize),

    #[error("Compound file has no directory entries")]
    RootDirectoryError,
}

/// A parsed container, held in memory.
pub(crate) struct Cfb {
    /// Entries by stream name
    directories: HashMap<String, DirectoryEntry>,
    fat: Vec<usize>,
    sectors: Sectors,
    mini_fat: Vec<usize>,
    /// Mini stream split into 64-byte sectors
    mini_sectors: Sectors,
    /// Streams smaller than this live in the mini stream
    mini_stream_cutoff: usize,
}

impl Cfb {
    /// Reads the entire container into memory and parses it.
    pub(crate) fn new<RS: Read + Seek>(reader: &mut RS) -> Result<Cfb, ContactsError> {
        let size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let mut data: Vec<u8> = Vec::with_capacity(size as usize);
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Parses a container already held in memory.
    pub(crate) fn from_bytes(data: Vec<u8>) -> Result<Cfb, ContactsError> {
        if data.len() < HEADER_SIZE {
            Err(CfbError::FileFormatError)?;
        }
        let header = Header::new(&data[..HEADER_SIZE])?;
        let size = header.sector_size()?;
        let sectors = Sectors { data, size, offset: size };
        let fat = Self::load_fat(&sectors, &header)?;
        let directories = Self::load_directories(&fat, &sectors, &header)?;
        let mini_fat = Self::load_mini_fat(&fat, &sectors, &header)?;
        let mini_sectors = match directories.get("Root Entry") {
            Some(root) => Self::load_mini_sectors(&fat, &sectors, root)?,
            None => Sectors { data: Vec::new(), size: MINI_SECTOR_SIZE, offset: 0 },
        };

        Ok(Cfb {
            directories,
            fat,
            sectors,
            mini_fat,
            mini_sectors,
            mini_stream_cutoff: header.mini_stream_cutoff,
        })
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.directories.contains_key(name)
    }

    /// Contents of the named stream, or `None` if there is no such stream.
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, ContactsError> {
        let Some(entry) = self.directories.get(name) else {
            return Ok(None);
        };
        let mut bytes = if entry.size < self.mini_stream_cutoff {
            Self::read_bytes(&self.mini_fat, &self.mini_sectors, entry.start)?
        } else {
            Self::read_bytes(&self.fat, &self.sectors, entry.start)?
        };
        bytes.truncate(entry.size);
        Ok(Some(bytes))
    }

    /// Collects the FAT from the sectors listed in the header's 109 DIFAT
    /// slots and any chained DIFAT sectors. The last slot of each DIFAT sector
    /// points to the next one.
    fn load_fat(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, ContactsError> {
        let mut difat: Vec<usize> = to_usize_iter(&sectors.data[76..HEADER_SIZE]).collect();

        let mut count = 0usize;
        let mut index = header.difat_start;
        while index < MAX_REG_SECT {
            if count >= header.difat_sectors {
                Err(CfbError::SectorChainError(header.difat_start))?
            }
            difat.extend(to_usize_iter(sectors.get(index)?));
            index = difat.pop().ok_or(CfbError::FileFormatError)?;
            count += 1;
        }
        if count != header.difat_sectors {
            Err(CfbError::DifatCountError(header.difat_sectors, count))?
        }

        let mut fat: Vec<usize> = Vec::new();
        let mut count = 0usize;
        for index in difat {
            if index < MAX_REG_SECT {
                fat.extend(to_usize_iter(sectors.get(index)?));
                count += 1;
            }
        }
        if count != header.fat_sectors {
            Err(CfbError::FatCountError(header.fat_sectors, count))?
        }

        Ok(fat)
    }

    fn load_directories(fat: &[usize], sectors: &Sectors, header: &Header) -> Result<HashMap<String, DirectoryEntry>, ContactsError> {
        let bytes = Self::read_bytes(fat, sectors, header.directory_start)?;
        let directories: HashMap<String, DirectoryEntry> = bytes
            .chunks_exact(DIRECTORY_SIZE)
            .filter_map(|entry| DirectoryEntry::parse(entry, header.major_version))
            .collect();
        if directories.is_empty() {
            Err(CfbError::RootDirectoryError)?
        }
        Ok(directories)
    }

    fn load_mini_fat(fat: &[usize], sectors: &Sectors, header: &Header) -> Result<Vec<usize>, ContactsError> {
        Ok(if header.mini_fat_sectors > 0 {
            let bytes = Self::read_bytes(fat, sectors, header.mini_fat_start)?;
            to_usize_iter(&bytes).collect()
        } else {
            Vec::new()
        })
    }

    /// The mini stream is the root entry's data.
    fn load_mini_sectors(fat: &[usize], sectors: &Sectors, root: &DirectoryEntry) -> Result<Sectors, ContactsError> {
        let mut data = Self::read_bytes(fat, sectors, root.start)?;
        data.truncate(root.size);
        Ok(Sectors { data, size: MINI_SECTOR_SIZE, offset: 0 })
    }

    /// Concatenates the sectors of the chain beginning at `start`.
    fn read_bytes(fat: &[usize], sectors: &Sectors, start: usize) -> Result<Vec<u8>, ContactsError> {
        let mut content: Vec<u8> = Vec::new();
        let mut index = start;
        let mut steps = 0usize;
        while index < MAX_REG_SECT {
            if steps > fat.len() {
                Err(CfbError::SectorChainError(start))?
            }
            content.extend_from_slice(sectors.get(index)?);
            index = *fat.get(index).ok_or(CfbError::SectorRangeError(index))?;
            steps += 1;
        }
        Ok(content)
    }
}

/// Sector storage; regular sectors start after the header, mini sectors at zero
#[derive(Debug)]
struct Sectors {
    data: Vec<u8>,
    size: usize,
    offset: usize,
}

impl Sectors {
    fn get(&self, index: usize) -> Result<&[u8], CfbError> {
        let source = index
            .checked_mul(self.size)
            .and_then(|position| position.checked_add(self.offset))
            .filter(|source| *source < self.data.len())
            .ok_or(CfbError::SectorRangeError(index))?;
        let target = self.data.len().min(source + self.size);
        Ok(&self.data[source..target])
    }
}

/// Fields of the 512 byte header that locate everything else.
#[derive(Debug)]
struct Header {
    major_version: u16,
    sector_shift: u16,
    fat_sectors: usize,
    directory_start: usize,
    mini_stream_cutoff: usize,
    mini_fat_start: usize,
    mini_fat_sectors: usize,
    difat_start: usize,
    difat_sectors: usize,
}

impl Header {
    fn new(data: &[u8]) -> Result<Self, CfbError> {
        if to_u64(&data[0..8]) != 0xE11A_B1A1_E011_CFD0 {
            Err(CfbError::OleSignatureError)?;
        }

        Ok(Header {
            major_version: to_u16(&data[26..28]),
            sector_shift: to_u16(&data[30..32]),
            fat_sectors: to_usize(&data[44..48]),
            directory_start: to_usize(&data[48..52]),
            mini_stream_cutoff: to_usize(&data[56..60]),
            mini_fat_start: to_usize(&data[60..64]),
            mini_fat_sectors: to_usize(&data[64..68]),
            difat_start: to_usize(&data[68..72]),
            difat_sectors: to_usize(&data[72..76]),
        })
    }

    fn sector_size(&self) -> Result<usize, CfbError> {
        match (self.major_version, self.sector_shift) {
            (3, 0x0009) => Ok(512),
            // Version 4 pads the 512 byte header to a full 4096 byte sector
            (4, 0x000C) => Ok(4096),
            _ => Err(CfbError::SectorSizeError(self.major_version, self.sector_shift)),
        }
    }
}

#[derive(Debug)]
struct DirectoryEntry {
    /// First sector of the stream
    start: usize,
    /// Stream size in bytes
    size: usize,
}

impl DirectoryEntry {
    /// Decodes a 128 byte entry; unallocated slots yield `None`.
    fn parse(bytes: &[u8], major_version: u16) -> Option<(String, DirectoryEntry)> {
        if bytes[66] == 0 {
            return None;
        }
        let name_size = usize::from(to_u16(&bytes[64..66])).min(64);
        let (name, _, _) = UTF_16LE.decode(&bytes[..name_size]);
        let name = match name.find('\0') {
            Some(position) => name[..position].to_owned(),
            None => name.to_string(),
        };

        let start = to_usize(&bytes[116..120]);
        let size = to_u64(&bytes[120..128]);
        // Version 3 writers may leave garbage in the high half
        let size = if major_version == 3 { size & 0xFFFF_FFFF } else { size } as usize;
        Some((name, DirectoryEntry { start, size }))
    }
}
