//! In-memory builder for small TIFF and BigTIFF files, in either byte order.
//!
//! Each IFD is laid out as its pixel chunks, then its out-of-line values, then the
//! directory itself. That is also how Aperio writes associated images, so files built
//! here look like the tail of a real slide.

use std::collections::BTreeMap;

use super::{ByteOrder, FieldType, TiffError, TiffKind, tag};

#[derive(Clone, Debug)]
enum Chunks {
    Strips(Vec<Vec<u8>>),
    Tiles(Vec<Vec<u8>>),
}

#[derive(Clone, Debug)]
enum Values {
    Short(Vec<u16>),
    Long(Vec<u32>),
    /// ASCII, BYTE and UNDEFINED values, which have no byte order.
    Bytes(FieldType, Vec<u8>),
}

impl Values {
    fn field_type(&self) -> FieldType {
        match self {
            Values::Short(_) => FieldType::Short,
            Values::Long(_) => FieldType::Long,
            Values::Bytes(field_type, _) => *field_type,
        }
    }

    fn count(&self) -> usize {
        match self {
            Values::Short(v) => v.len(),
            Values::Long(v) => v.len(),
            Values::Bytes(_, v) => v.len(),
        }
    }

    fn encode(&self, order: ByteOrder) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Values::Short(v) => v.iter().for_each(|x| order.put_u16(&mut buf, *x)),
            Values::Long(v) => v.iter().for_each(|x| order.put_u32(&mut buf, *x)),
            Values::Bytes(_, v) => buf.extend_from_slice(v),
        }
        buf
    }
}

/// Fields and pixel data of one page to be written.
#[derive(Clone, Debug, Default)]
pub struct IfdBuilder {
    fields: BTreeMap<u16, Values>,
    chunks: Option<Chunks>,
}

impl IfdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn short(mut self, tag: u16, values: &[u16]) -> Self {
        self.fields.insert(tag, Values::Short(values.to_vec()));
        self
    }

    pub fn long(mut self, tag: u16, values: &[u32]) -> Self {
        self.fields.insert(tag, Values::Long(values.to_vec()));
        self
    }

    /// Adds a NUL-terminated ASCII value.
    pub fn ascii(self, tag: u16, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.raw(tag, FieldType::Ascii, bytes)
    }

    /// Adds a value made of single bytes (BYTE, ASCII or UNDEFINED).
    pub fn raw(mut self, tag: u16, field_type: FieldType, bytes: Vec<u8>) -> Self {
        self.fields.insert(tag, Values::Bytes(field_type, bytes));
        self
    }

    /// Stores the page as strips; offsets and byte counts are filled in on write.
    pub fn strips(mut self, strips: Vec<Vec<u8>>) -> Self {
        self.chunks = Some(Chunks::Strips(strips));
        self
    }

    /// Stores the page as tiles; offsets and byte counts are filled in on write.
    pub fn tiles(mut self, tiles: Vec<Vec<u8>>) -> Self {
        self.chunks = Some(Chunks::Tiles(tiles));
        self
    }
}

#[derive(Clone, Debug)]
pub struct TiffWriter {
    byte_order: ByteOrder,
    kind: TiffKind,
    ifds: Vec<IfdBuilder>,
}

impl Default for TiffWriter {
    fn default() -> Self {
        Self::with_format(ByteOrder::Little, TiffKind::Classic)
    }
}

impl TiffWriter {
    /// Little-endian classic TIFF.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(byte_order: ByteOrder, kind: TiffKind) -> Self {
        Self {
            byte_order,
            kind,
            ifds: Vec::new(),
        }
    }

    pub fn ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    pub fn finish(self) -> Result<Vec<u8>, TiffError> {
        let (order, kind) = (self.byte_order, self.kind);

        let mut buf: Vec<u8> = order.mark().to_vec();
        match kind {
            TiffKind::Classic => order.put_u16(&mut buf, 42),
            TiffKind::Big => {
                order.put_u16(&mut buf, 43);
                order.put_u16(&mut buf, 8);
                order.put_u16(&mut buf, 0);
            }
        }
        let mut pointer_at = buf.len();
        kind.put_offset(order, &mut buf, 0)?;

        for mut ifd in self.ifds {
            if let Some(chunks) = ifd.chunks.take() {
                let (offsets_tag, counts_tag, chunks) = match chunks {
                    Chunks::Strips(c) => (tag::STRIP_OFFSETS, tag::STRIP_BYTE_COUNTS, c),
                    Chunks::Tiles(c) => (tag::TILE_OFFSETS, tag::TILE_BYTE_COUNTS, c),
                };

                let mut offsets: Vec<u32> = Vec::with_capacity(chunks.len());
                let mut counts: Vec<u32> = Vec::with_capacity(chunks.len());
                for chunk in chunks {
                    offsets.push(to_u32(buf.len())?);
                    counts.push(to_u32(chunk.len())?);
                    buf.extend_from_slice(&chunk);
                }
                ifd = ifd.long(offsets_tag, &offsets).long(counts_tag, &counts);
            }

            let encoded: BTreeMap<u16, Vec<u8>> = ifd
                .fields
                .iter()
                .map(|(tag, values)| (*tag, values.encode(order)))
                .collect();

            let mut value_offsets: BTreeMap<u16, u64> = BTreeMap::new();
            for (tag, bytes) in &encoded {
                if bytes.len() as u64 > kind.inline_size() {
                    pad_to_word(&mut buf);
                    value_offsets.insert(*tag, buf.len() as u64);
                    buf.extend_from_slice(bytes);
                }
            }

            pad_to_word(&mut buf);
            let mut pointer = Vec::new();
            kind.put_offset(order, &mut pointer, buf.len() as u64)?;
            buf[pointer_at..pointer_at + pointer.len()].copy_from_slice(&pointer);

            match kind {
                TiffKind::Classic => {
                    let count =
                        u16::try_from(ifd.fields.len()).map_err(|_| TiffError::TooLarge)?;
                    order.put_u16(&mut buf, count);
                }
                TiffKind::Big => order.put_u64(&mut buf, ifd.fields.len() as u64),
            }

            for (tag, values) in &ifd.fields {
                order.put_u16(&mut buf, *tag);
                order.put_u16(&mut buf, values.field_type().code());
                kind.put_offset(order, &mut buf, values.count() as u64)?;
                match value_offsets.get(tag) {
                    Some(offset) => kind.put_offset(order, &mut buf, *offset)?,
                    None => {
                        let mut inline = vec![0u8; kind.inline_size() as usize];
                        let bytes = &encoded[tag];
                        inline[..bytes.len()].copy_from_slice(bytes);
                        buf.extend_from_slice(&inline);
                    }
                }
            }

            pointer_at = buf.len();
            kind.put_offset(order, &mut buf, 0)?;
        }

        Ok(buf)
    }
}

fn to_u32(value: usize) -> Result<u32, TiffError> {
    u32::try_from(value).map_err(|_| TiffError::TooLarge)
}

fn pad_to_word(buf: &mut Vec<u8>) {
    if buf.len() % 2 == 1 {
        buf.push(0);
    }
}
