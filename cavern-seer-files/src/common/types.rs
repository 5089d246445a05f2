use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::ParserError;

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct C3Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl C3Vector {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn min(&self, other: &C3Vector) -> C3Vector {
        C3Vector::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(&self, other: &C3Vector) -> C3Vector {
        C3Vector::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl From<[f32; 3]> for C3Vector {
    fn from(value: [f32; 3]) -> Self {
        C3Vector::new(value[0], value[1], value[2])
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct C2Vector {
    pub x: f32,
    pub y: f32,
}

/// Axis aligned box, `min` is component-wise smaller or equal than `max`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CAaBox {
    pub min: C3Vector,
    pub max: C3Vector,
}

impl CAaBox {
    pub fn from_point(point: C3Vector) -> Self {
        Self { min: point, max: point }
    }

    /// `None` when the iterator is empty.
    pub fn from_points<'a, I: IntoIterator<Item = &'a C3Vector>>(points: I) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<CAaBox>, point| match acc {
            None => Some(CAaBox::from_point(*point)),
            Some(aabb) => Some(aabb.extended(point)),
        })
    }

    pub fn extended(&self, point: &C3Vector) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn union(&self, other: &CAaBox) -> Self {
        Self {
            min: self.min.min(&other.min),
            max: self.max.max(&other.max),
        }
    }
}

/// A little endian, length prefixed chunk as used by binary glTF.
#[derive(Debug)]
pub(crate) struct LengthPrefixedChunk {
    pub length: u32,
    pub magic: u32,
    pub data: Vec<u8>,
}

impl LengthPrefixedChunk {
    pub fn read_next_chunk<R: Read>(rdr: &mut R) -> Result<LengthPrefixedChunk, ParserError> {
        let length = rdr.read_u32::<LittleEndian>()?;
        let magic = rdr.read_u32::<LittleEndian>()?;
        let mut data = vec![0; length as usize];
        rdr.read_exact(&mut data)?;

        Ok(LengthPrefixedChunk { length, magic, data })
    }
}

/// The 8 byte header in front of a [`LengthPrefixedChunk`], for chunks that are skipped rather than read.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct ChunkHeader {
    pub length: u32,
    pub magic: u32,
}

impl ChunkHeader {
    /// `None` when the reader is exhausted right at the chunk boundary.
    pub fn read_optional<R: Read>(rdr: &mut R) -> Result<Option<ChunkHeader>, ParserError> {
        let mut header = Vec::with_capacity(8);
        Read::take(&mut *rdr, 8).read_to_end(&mut header)?;
        match header.len() {
            0 => Ok(None),
            8 => {
                let mut header = header.as_slice();
                let length = header.read_u32::<LittleEndian>()?;
                let magic = header.read_u32::<LittleEndian>()?;
                Ok(Some(ChunkHeader { length, magic }))
            }
            _ => Err(ParserError::FormatError {
                reason: "Truncated chunk header",
            }),
        }
    }

    pub fn skip_data<R: Read>(&self, rdr: &mut R) -> Result<(), ParserError> {
        let skipped = std::io::copy(&mut Read::take(&mut *rdr, self.length as u64), &mut std::io::sink())?;
        if skipped < self.length as u64 {
            return Err(ParserError::FormatError {
                reason: "Truncated chunk data",
            });
        }
        Ok(())
    }
}
