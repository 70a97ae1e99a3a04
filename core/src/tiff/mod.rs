//! # TIFF Container
//!
//! A minimal reader for the TIFF and BigTIFF structure that slide formats build on.
//!
//! Only the container is modelled: the header, the chain of image file directories
//! (IFDs) and the position of every value in the file. Pixel decoding is left to the
//! `image` crate. Keeping absolute positions around is what lets [`crate::svs`] patch
//! a slide in place without rewriting it.

use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom};

use thiserror::Error;

pub mod field;
pub mod page;
pub mod writer;

pub use field::{FieldType, tag};
pub use page::{Layout, Page};

#[derive(Debug, Error)]
pub enum TiffError {
    #[error("not a TIFF file (bad byte order mark)")]
    BadMagic,
    #[error("unsupported TIFF version {0}")]
    UnsupportedVersion(u16),
    #[error("file is truncated near offset {offset}")]
    Truncated { offset: u64 },
    #[error("IFD chain loops back to offset {0}")]
    CyclicChain(u64),
    #[error("tag {tag} has type {field_type:?}, expected an integer type")]
    UnexpectedFieldType { tag: u16, field_type: FieldType },
    #[error("file is too large for a classic TIFF")]
    TooLarge,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(bytes),
            ByteOrder::Big => u16::from_be_bytes(bytes),
        }
    }

    pub fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    pub fn u64(self, bytes: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Little => u64::from_le_bytes(bytes),
            ByteOrder::Big => u64::from_be_bytes(bytes),
        }
    }

    pub fn put_u16(self, buf: &mut Vec<u8>, value: u16) {
        match self {
            ByteOrder::Little => buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    pub fn put_u32(self, buf: &mut Vec<u8>, value: u32) {
        match self {
            ByteOrder::Little => buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    pub fn put_u64(self, buf: &mut Vec<u8>, value: u64) {
        match self {
            ByteOrder::Little => buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    pub const fn mark(self) -> &'static [u8; 2] {
        match self {
            ByteOrder::Little => b"II",
            ByteOrder::Big => b"MM",
        }
    }
}

/// Classic TIFF (32-bit offsets) or BigTIFF (64-bit offsets).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TiffKind {
    Classic,
    Big,
}

impl TiffKind {
    pub const fn offset_size(self) -> u64 {
        match self {
            TiffKind::Classic => 4,
            TiffKind::Big => 8,
        }
    }

    pub const fn entry_count_size(self) -> u64 {
        match self {
            TiffKind::Classic => 2,
            TiffKind::Big => 8,
        }
    }

    pub const fn entry_size(self) -> u64 {
        match self {
            TiffKind::Classic => 12,
            TiffKind::Big => 20,
        }
    }

    /// Values up to this many bytes live inside the entry itself.
    pub const fn inline_size(self) -> u64 {
        self.offset_size()
    }

    /// Appends an offset (or a BigTIFF count) in this kind's width.
    pub fn put_offset(
        self,
        order: ByteOrder,
        buf: &mut Vec<u8>,
        value: u64,
    ) -> Result<(), TiffError> {
        match self {
            TiffKind::Classic => {
                let value = u32::try_from(value).map_err(|_| TiffError::TooLarge)?;
                order.put_u32(buf, value);
            }
            TiffKind::Big => order.put_u64(buf, value),
        }
        Ok(())
    }
}

/// One directory entry, with its value located in absolute file terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u64,
    /// Where the value bytes start: inside the entry when inline, else the pointed-to offset.
    pub value_offset: u64,
    pub value_len: u64,
    inline: bool,
}

impl Entry {
    pub fn is_inline(&self) -> bool {
        self.inline
    }
}

/// An image file directory, i.e. one page of the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ifd {
    pub offset: u64,
    pub entries: Vec<Entry>,
    /// Position of this IFD's next-IFD pointer.
    pub next_pointer_at: u64,
    /// Value of that pointer, `0` for the last IFD.
    pub next_ifd: u64,
    offset_size: u64,
}

impl Ifd {
    pub fn entry(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Bytes from the start of the IFD through the end of its next pointer.
    pub fn header_len(&self) -> u64 {
        self.next_pointer_at - self.offset + self.offset_size
    }
}

#[derive(Clone, Debug)]
pub struct Tiff {
    pub byte_order: ByteOrder,
    pub kind: TiffKind,
    pub file_len: u64,
    /// Position of the header's first-IFD pointer.
    pub first_ifd_at: u64,
    pub ifds: Vec<Ifd>,
}

impl Tiff {
    /// Parses the header and walks the whole IFD chain.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, TiffError> {
        let file_len = reader.seek(SeekFrom::End(0))?;

        let mut header = [0u8; 4];
        read_at(reader, 0, &mut header, file_len)?;

        let byte_order = match &header[..2] {
            b"II" => ByteOrder::Little,
            b"MM" => ByteOrder::Big,
            _ => return Err(TiffError::BadMagic),
        };

        let version = byte_order.u16([header[2], header[3]]);
        let (kind, first_ifd_at) = match version {
            42 => (TiffKind::Classic, 4),
            43 => {
                let mut ext = [0u8; 4];
                read_at(reader, 4, &mut ext, file_len)?;
                if byte_order.u16([ext[0], ext[1]]) != 8 {
                    return Err(TiffError::UnsupportedVersion(version));
                }
                (TiffKind::Big, 8)
            }
            other => return Err(TiffError::UnsupportedVersion(other)),
        };

        let mut tiff = Tiff {
            byte_order,
            kind,
            file_len,
            first_ifd_at,
            ifds: Vec::new(),
        };

        let mut seen: HashSet<u64> = HashSet::new();
        let mut next: u64 = tiff.read_offset(reader, first_ifd_at)?;
        while next != 0 {
            if !seen.insert(next) {
                return Err(TiffError::CyclicChain(next));
            }
            let ifd = tiff.read_ifd(reader, next)?;
            next = ifd.next_ifd;
            tiff.ifds.push(ifd);
        }

        Ok(tiff)
    }

    /// Finds the IFD whose next pointer refers to `offset`.
    pub fn predecessor_of(&self, offset: u64) -> Option<&Ifd> {
        self.ifds.iter().find(|ifd| ifd.next_ifd == offset)
    }

    /// Encodes an IFD offset the way this file stores pointers.
    pub fn encode_offset(&self, value: u64) -> Result<Vec<u8>, TiffError> {
        let mut bytes = Vec::with_capacity(self.kind.offset_size() as usize);
        self.kind.put_offset(self.byte_order, &mut bytes, value)?;
        Ok(bytes)
    }

    pub fn read_bytes<R: Read + Seek>(
        &self,
        reader: &mut R,
        entry: &Entry,
    ) -> Result<Vec<u8>, TiffError> {
        let len = usize::try_from(entry.value_len).map_err(|_| TiffError::TooLarge)?;
        let mut buf = vec![0u8; len];
        read_at(reader, entry.value_offset, &mut buf, self.file_len)?;
        Ok(buf)
    }

    /// Reads an ASCII value up to its first NUL.
    pub fn read_ascii<R: Read + Seek>(
        &self,
        reader: &mut R,
        entry: &Entry,
    ) -> Result<String, TiffError> {
        let bytes = self.read_bytes(reader, entry)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Reads an array of unsigned integers of any width.
    pub fn read_values<R: Read + Seek>(
        &self,
        reader: &mut R,
        entry: &Entry,
    ) -> Result<Vec<u64>, TiffError> {
        let bytes = self.read_bytes(reader, entry)?;
        let order = self.byte_order;

        let values = match entry.field_type {
            FieldType::Byte | FieldType::Undefined => bytes.iter().map(|b| *b as u64).collect(),
            FieldType::Short => bytes
                .chunks_exact(2)
                .map(|c| order.u16([c[0], c[1]]) as u64)
                .collect(),
            FieldType::Long | FieldType::Ifd => bytes
                .chunks_exact(4)
                .map(|c| order.u32([c[0], c[1], c[2], c[3]]) as u64)
                .collect(),
            FieldType::Long8 | FieldType::Ifd8 => bytes
                .chunks_exact(8)
                .map(|c| order.u64([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
            field_type => {
                return Err(TiffError::UnexpectedFieldType {
                    tag: entry.tag,
                    field_type,
                });
            }
        };
        Ok(values)
    }

    /// Reads the first integer of an entry, if the IFD has it.
    pub fn read_scalar<R: Read + Seek>(
        &self,
        reader: &mut R,
        ifd: &Ifd,
        tag: u16,
    ) -> Result<Option<u64>, TiffError> {
        match ifd.entry(tag) {
            Some(entry) => Ok(self.read_values(reader, entry)?.first().copied()),
            None => Ok(None),
        }
    }

    fn read_offset<R: Read + Seek>(&self, reader: &mut R, at: u64) -> Result<u64, TiffError> {
        match self.kind {
            TiffKind::Classic => {
                let mut buf = [0u8; 4];
                read_at(reader, at, &mut buf, self.file_len)?;
                Ok(self.byte_order.u32(buf) as u64)
            }
            TiffKind::Big => {
                let mut buf = [0u8; 8];
                read_at(reader, at, &mut buf, self.file_len)?;
                Ok(self.byte_order.u64(buf))
            }
        }
    }

    fn read_ifd<R: Read + Seek>(&self, reader: &mut R, offset: u64) -> Result<Ifd, TiffError> {
        let order = self.byte_order;
        let kind = self.kind;

        let count: u64 = match kind {
            TiffKind::Classic => {
                let mut buf = [0u8; 2];
                read_at(reader, offset, &mut buf, self.file_len)?;
                order.u16(buf) as u64
            }
            TiffKind::Big => {
                let mut buf = [0u8; 8];
                read_at(reader, offset, &mut buf, self.file_len)?;
                order.u64(buf)
            }
        };

        let entries_at = offset + kind.entry_count_size();
        let entries_len = count
            .checked_mul(kind.entry_size())
            .filter(|len| entries_at.saturating_add(*len) <= self.file_len)
            .ok_or(TiffError::Truncated { offset })?;

        let mut raw = vec![0u8; entries_len as usize];
        read_at(reader, entries_at, &mut raw, self.file_len)?;

        let mut entries = Vec::with_capacity(count as usize);
        for (i, chunk) in raw.chunks_exact(kind.entry_size() as usize).enumerate() {
            let entry_at = entries_at + i as u64 * kind.entry_size();
            entries.push(self.parse_entry(chunk, entry_at)?);
        }

        let next_pointer_at = entries_at + entries_len;
        let next_ifd = self.read_offset(reader, next_pointer_at)?;

        Ok(Ifd {
            offset,
            entries,
            next_pointer_at,
            next_ifd,
            offset_size: kind.offset_size(),
        })
    }

    fn parse_entry(&self, chunk: &[u8], entry_at: u64) -> Result<Entry, TiffError> {
        let order = self.byte_order;
        let tag = order.u16([chunk[0], chunk[1]]);
        let field_type = FieldType::from_code(order.u16([chunk[2], chunk[3]]));

        let (count, value_field_at, pointer) = match self.kind {
            TiffKind::Classic => {
                let count = order.u32([chunk[4], chunk[5], chunk[6], chunk[7]]) as u64;
                let pointer = order.u32([chunk[8], chunk[9], chunk[10], chunk[11]]) as u64;
                (count, entry_at + 8, pointer)
            }
            TiffKind::Big => {
                let mut count = [0u8; 8];
                count.copy_from_slice(&chunk[4..12]);
                let mut pointer = [0u8; 8];
                pointer.copy_from_slice(&chunk[12..20]);
                (order.u64(count), entry_at + 12, order.u64(pointer))
            }
        };

        let value_len = count
            .checked_mul(field_type.size())
            .ok_or(TiffError::Truncated { offset: entry_at })?;
        let inline = value_len <= self.kind.inline_size();
        let value_offset = if inline { value_field_at } else { pointer };

        if value_offset.saturating_add(value_len) > self.file_len {
            return Err(TiffError::Truncated {
                offset: value_offset,
            });
        }

        Ok(Entry {
            tag,
            field_type,
            count,
            value_offset,
            value_len,
            inline,
        })
    }
}

fn read_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    buf: &mut [u8],
    file_len: u64,
) -> Result<(), TiffError> {
    if offset.saturating_add(buf.len() as u64) > file_len {
        return Err(TiffError::Truncated { offset });
    }
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => TiffError::Truncated { offset },
        _ => TiffError::Io(e),
    })
}
