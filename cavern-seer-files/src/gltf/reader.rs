use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::ParserError;
use crate::common::types::{ChunkHeader, LengthPrefixedChunk};
use crate::gltf::types::{GLB_CHUNK_BIN, GLB_CHUNK_JSON, GLB_MAGIC, GltfAsset, GltfDocument};

pub struct GltfReader {}

impl GltfReader {
    /// Detects binary glTF by its magic value, everything else is treated as JSON.
    pub fn parse_asset(data: &[u8]) -> Result<GltfAsset, ParserError> {
        if data.len() >= 4 && data[..4] == GLB_MAGIC.to_le_bytes() {
            Self::parse_glb(&mut std::io::Cursor::new(data))
        } else {
            Self::parse_json(data)
        }
    }

    /// Only the JSON document, the BIN chunk of binary glTF is neither read nor validated.
    pub fn parse_document_only(data: &[u8]) -> Result<GltfDocument, ParserError> {
        if data.len() >= 4 && data[..4] == GLB_MAGIC.to_le_bytes() {
            Self::read_glb_document(&mut std::io::Cursor::new(data))
        } else {
            Self::parse_document(data)
        }
    }

    pub fn parse_json(data: &[u8]) -> Result<GltfAsset, ParserError> {
        let document = Self::parse_document(data)?;
        Ok(GltfAsset {
            document,
            binary: false,
            binary_chunk_length: None,
        })
    }

    pub fn parse_glb<R: Read>(rdr: &mut R) -> Result<GltfAsset, ParserError> {
        let document = Self::read_glb_document(rdr)?;

        // The BIN chunk is optional, it is only missing if the file ends right after the JSON chunk
        let binary_chunk_length = match ChunkHeader::read_optional(rdr)? {
            Some(header) if header.magic == GLB_CHUNK_BIN => {
                header.skip_data(rdr)?;
                Some(header.length)
            }
            Some(_) => {
                return Err(ParserError::FormatError {
                    reason: "Unexpected chunk after the JSON chunk",
                });
            }
            None => None,
        };

        Ok(GltfAsset {
            document,
            binary: true,
            binary_chunk_length,
        })
    }

    fn read_glb_document<R: Read>(rdr: &mut R) -> Result<GltfDocument, ParserError> {
        let magic = rdr.read_u32::<LittleEndian>()?;
        if magic != GLB_MAGIC {
            return Err(ParserError::InvalidMagicValue { magic });
        }

        let version = rdr.read_u32::<LittleEndian>()?;
        if version != 2 {
            return Err(ParserError::FormatError {
                reason: "Only binary glTF version 2 is supported",
            });
        }
        let _total_length = rdr.read_u32::<LittleEndian>()?;

        let json_chunk = LengthPrefixedChunk::read_next_chunk(rdr)?;
        if json_chunk.magic != GLB_CHUNK_JSON {
            return Err(ParserError::FormatError {
                reason: "The first GLB chunk has to be the JSON chunk",
            });
        }
        Self::parse_document(&json_chunk.data)
    }

    fn parse_document(data: &[u8]) -> Result<GltfDocument, ParserError> {
        // JSON chunks are padded with spaces, but some exporters pad with zeroes
        let text = std::str::from_utf8(data)?.trim_end_matches('\0');
        let document: GltfDocument = serde_json::from_str(text)?;
        if !document.asset.version.starts_with('2') {
            return Err(ParserError::FormatError {
                reason: "Only glTF 2.x documents are supported",
            });
        }
        Ok(document)
    }
}
