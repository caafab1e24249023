//! Byte accumulators that turn scalar streams into typed, endian-correct buffers.
//!
//! Fixed-width builders ([`FloatBufferBuilder`], [`ShortBufferBuilder`]) simply
//! append. [`IndexBufferBuilder`] discovers its element width lazily: it starts
//! at one byte per index and re-packs everything it holds whenever a value no
//! longer fits, so callers never declare an index range up front.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::IndexOverflow;

/// Byte order of a buffer or stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of the running target.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    #[inline]
    pub fn is_big(self) -> bool {
        self == Endian::Big
    }

    #[inline]
    pub(crate) fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    #[inline]
    pub(crate) fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    #[inline]
    pub(crate) fn read_f32(self, buf: &[u8]) -> f32 {
        match self {
            Endian::Little => LittleEndian::read_f32(buf),
            Endian::Big => BigEndian::read_f32(buf),
        }
    }

    #[inline]
    pub(crate) fn write_u16(self, buf: &mut [u8], value: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(buf, value),
            Endian::Big => BigEndian::write_u16(buf, value),
        }
    }

    #[inline]
    pub(crate) fn write_u32(self, buf: &mut [u8], value: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, value),
            Endian::Big => BigEndian::write_u32(buf, value),
        }
    }

    #[inline]
    pub(crate) fn write_f32(self, buf: &mut [u8], value: f32) {
        match self {
            Endian::Little => LittleEndian::write_f32(buf, value),
            Endian::Big => BigEndian::write_f32(buf, value),
        }
    }
}

impl Default for Endian {
    fn default() -> Self {
        Self::native()
    }
}

/// Bytes per element of an integer buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ElementWidth {
    Byte = 1,
    Short = 2,
    Int = 4,
}

impl ElementWidth {
    #[inline]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Smallest width able to hold `value`.
    pub const fn for_value(value: u32) -> Self {
        if value < 0x100 {
            ElementWidth::Byte
        } else if value < 0x1_0000 {
            ElementWidth::Short
        } else {
            ElementWidth::Int
        }
    }

    /// Width used on disk for indices into a buffer of `vertex_count` vertices.
    pub const fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count <= 0x100 {
            ElementWidth::Byte
        } else if vertex_count <= 0x1_0000 {
            ElementWidth::Short
        } else {
            ElementWidth::Int
        }
    }

    /// Largest value representable at this width.
    pub const fn max_value(self) -> u32 {
        match self {
            ElementWidth::Byte => u8::MAX as u32,
            ElementWidth::Short => u16::MAX as u32,
            ElementWidth::Int => u32::MAX,
        }
    }

    fn read(self, endian: Endian, buf: &[u8]) -> u32 {
        match self {
            ElementWidth::Byte => buf[0] as u32,
            ElementWidth::Short => endian.read_u16(buf) as u32,
            ElementWidth::Int => endian.read_u32(buf),
        }
    }

    /// Append `value` truncated to this width.
    fn write(self, endian: Endian, value: u32, out: &mut Vec<u8>) {
        let mut raw = [0u8; 4];
        match self {
            ElementWidth::Byte => raw[0] = value as u8,
            ElementWidth::Short => endian.write_u16(&mut raw, value as u16),
            ElementWidth::Int => endian.write_u32(&mut raw, value),
        }
        out.extend_from_slice(&raw[..self.bytes()]);
    }
}

/// Integer buffer tagged with its element width and byte order.
///
/// Equality compares decoded values, so two buffers holding the same
/// numbers are equal whatever width or byte order they were packed with.
#[derive(Clone, Debug)]
pub struct TypedBuffer {
    width: ElementWidth,
    endian: Endian,
    bytes: Vec<u8>,
}

impl TypedBuffer {
    pub fn empty(width: ElementWidth) -> Self {
        Self {
            width,
            endian: Endian::native(),
            bytes: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> ElementWidth {
        self.width
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.width.bytes()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        let w = self.width.bytes();
        let start = index.checked_mul(w)?;
        let chunk = self.bytes.get(start..start + w)?;
        Some(self.width.read(self.endian, chunk))
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes
            .chunks_exact(self.width.bytes())
            .map(|chunk| self.width.read(self.endian, chunk))
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    pub fn max_value(&self) -> Option<u32> {
        self.iter().max()
    }

    /// Raw packed bytes, ready for upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for TypedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

/// `f32` buffer tagged with its byte order.
///
/// Equality is bitwise per element (`NaN == NaN` when the bits match).
#[derive(Clone, Debug)]
pub struct FloatBuffer {
    endian: Endian,
    bytes: Vec<u8>,
}

impl FloatBuffer {
    pub fn from_slice(values: &[f32]) -> Self {
        let mut builder = FloatBufferBuilder::new();
        builder.extend(values.iter().copied());
        builder.build()
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        let start = index.checked_mul(4)?;
        let chunk = self.bytes.get(start..start + 4)?;
        Some(self.endian.read_f32(chunk))
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.bytes
            .chunks_exact(4)
            .map(|chunk| self.endian.read_f32(chunk))
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for FloatBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().map(f32::to_bits).eq(other.iter().map(f32::to_bits))
    }
}

/// Accumulates `f32` values.
#[derive(Clone, Debug, Default)]
pub struct FloatBufferBuilder {
    endian: Endian,
    bytes: Vec<u8>,
}

impl FloatBufferBuilder {
    pub fn new() -> Self {
        Self::with_endian(Endian::native())
    }

    pub fn with_endian(endian: Endian) -> Self {
        Self {
            endian,
            bytes: Vec::new(),
        }
    }

    pub fn add(&mut self, value: f32) {
        let mut raw = [0u8; 4];
        self.endian.write_f32(&mut raw, value);
        self.bytes.extend_from_slice(&raw);
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = f32>) {
        for value in values {
            self.add(value);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hand out the accumulated buffer and start over.
    pub fn build(&mut self) -> FloatBuffer {
        FloatBuffer {
            endian: self.endian,
            bytes: std::mem::take(&mut self.bytes),
        }
    }
}

/// Accumulates 16-bit values.
#[derive(Clone, Debug, Default)]
pub struct ShortBufferBuilder {
    endian: Endian,
    bytes: Vec<u8>,
}

impl ShortBufferBuilder {
    pub fn new() -> Self {
        Self::with_endian(Endian::native())
    }

    pub fn with_endian(endian: Endian) -> Self {
        Self {
            endian,
            bytes: Vec::new(),
        }
    }

    pub fn add(&mut self, value: u16) {
        ElementWidth::Short.write(self.endian, value as u32, &mut self.bytes);
    }

    pub fn add_signed(&mut self, value: i16) {
        self.add(value as u16);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / 2
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn build(&mut self) -> TypedBuffer {
        TypedBuffer {
            width: ElementWidth::Short,
            endian: self.endian,
            bytes: std::mem::take(&mut self.bytes),
        }
    }
}

/// Index accumulator with lazy width promotion.
///
/// Every value is rebased by `offset` before it is stored. The element width
/// never drops below `min_width`.
#[derive(Clone, Debug)]
pub struct IndexBufferBuilder {
    endian: Endian,
    min_width: ElementWidth,
    width: ElementWidth,
    offset: u32,
    bytes: Vec<u8>,
}

impl Default for IndexBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBufferBuilder {
    pub fn new() -> Self {
        Self::with_endian(Endian::native())
    }

    pub fn with_endian(endian: Endian) -> Self {
        Self {
            endian,
            min_width: ElementWidth::Byte,
            width: ElementWidth::Byte,
            offset: 0,
            bytes: Vec::new(),
        }
    }

    /// Builder that starts at (and never goes below) `width`.
    pub fn with_min_width(mut self, width: ElementWidth) -> Self {
        self.min_width = width;
        self.width = self.width.max(width);
        self
    }

    #[inline]
    pub fn width(&self) -> ElementWidth {
        self.width
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Added to every subsequent value before it is stored.
    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.width.bytes()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Store `value + offset`, widening the buffer if needed.
    ///
    /// # Panics
    ///
    /// If `value + offset` overflows `u32`. Use [`IndexBufferBuilder::try_add`]
    /// when the offset is not known to be small.
    pub fn add(&mut self, value: u32) {
        if let Err(err) = self.try_add(value) {
            panic!("{err}");
        }
    }

    /// Like [`IndexBufferBuilder::add`], but leaves the builder untouched when
    /// the rebased value does not fit.
    pub fn try_add(&mut self, value: u32) -> Result<(), IndexOverflow> {
        let value = value.checked_add(self.offset).ok_or(IndexOverflow {
            value,
            offset: self.offset,
        })?;
        let needed = ElementWidth::for_value(value);
        if needed > self.width {
            self.repack(needed);
        }
        self.width.write(self.endian, value, &mut self.bytes);
        Ok(())
    }

    /// Re-encode every stored value at `width`. Narrowing is ignored.
    pub fn repack(&mut self, width: ElementWidth) {
        if width <= self.width {
            return;
        }

        let old = self.width;
        let stored = std::mem::take(&mut self.bytes);
        log::trace!(
            "Promoting index buffer from {} to {} bytes ({} values)",
            old.bytes(),
            width.bytes(),
            stored.len() / old.bytes()
        );

        self.width = width;
        self.bytes.reserve(stored.len() / old.bytes() * width.bytes());
        for chunk in stored.chunks_exact(old.bytes()) {
            let value = old.read(self.endian, chunk);
            width.write(self.endian, value, &mut self.bytes);
        }
    }

    /// Hand out the accumulated buffer and start over at the minimum width.
    /// Byte order, minimum width and offset are kept.
    pub fn build(&mut self) -> TypedBuffer {
        let buffer = TypedBuffer {
            width: self.width,
            endian: self.endian,
            bytes: std::mem::take(&mut self.bytes),
        };
        self.width = self.min_width;
        buffer
    }
}
