use std::io::BufRead;

use crate::ParserError;
use crate::common::reader::{KeywordLine, for_each_keyword_line};
use crate::obj::types::{ObjAsset, ObjFace, ObjFaceVertex};

pub struct ObjReader {}

impl ObjReader {
    /// Scans only for `mtllib` statements, without building the geometry.
    pub fn parse_material_libraries<R: BufRead>(rdr: &mut R) -> Result<Vec<String>, ParserError> {
        let mut libraries = Vec::new();
        for_each_keyword_line(rdr, |line| {
            if line.keyword == "mtllib" && !line.rest.is_empty() {
                libraries.push(line.rest.to_string());
            }
            Ok(())
        })?;
        Ok(libraries)
    }

    pub fn parse_asset<R: BufRead>(rdr: &mut R) -> Result<ObjAsset, ParserError> {
        let mut asset = ObjAsset::default();
        let mut current_material: Option<usize> = None;

        for_each_keyword_line(rdr, |mut line| {
            match line.keyword {
                "v" => asset.positions.push(line.c3vector()?),
                "vt" => asset.texcoords.push(line.c2vector()?),
                "vn" => asset.normals.push(line.c3vector()?),
                "f" => {
                    let face = Self::parse_face(&line, &asset, current_material)?;
                    asset.faces.push(face);
                }
                "mtllib" => {
                    if line.rest.is_empty() {
                        return Err(line.error("mtllib without a file name"));
                    }
                    asset.material_libraries.push(line.rest.to_string());
                }
                "usemtl" => {
                    let name = line.rest;
                    let idx = match asset.material_names.iter().position(|known| known == name) {
                        Some(idx) => idx,
                        None => {
                            asset.material_names.push(name.to_string());
                            asset.material_names.len() - 1
                        }
                    };
                    current_material = Some(idx);
                }
                "o" | "g" => {
                    if !line.rest.is_empty() {
                        asset.object_names.push(line.rest.to_string());
                    }
                }
                // smoothing groups, lines, points and free-form geometry are irrelevant for us
                _ => {}
            }
            Ok(())
        })?;

        Ok(asset)
    }

    fn parse_face(line: &KeywordLine<'_>, asset: &ObjAsset, material: Option<usize>) -> Result<ObjFace, ParserError> {
        let mut vertices = Vec::with_capacity(4);

        for token in line.args.clone() {
            let mut parts = token.split('/');
            let position = parts
                .next()
                .filter(|part| !part.is_empty())
                .ok_or_else(|| line.error(format!("face vertex '{token}' lacks a position")))?;

            let position = Self::resolve_index(line, position, asset.positions.len())?;
            let texcoord = match parts.next() {
                Some(part) if !part.is_empty() => Some(Self::resolve_index(line, part, asset.texcoords.len())?),
                _ => None,
            };
            let normal = match parts.next() {
                Some(part) if !part.is_empty() => Some(Self::resolve_index(line, part, asset.normals.len())?),
                _ => None,
            };

            vertices.push(ObjFaceVertex {
                position,
                texcoord,
                normal,
            });
        }

        if vertices.len() < 3 {
            return Err(line.error(format!("face with {} vertices", vertices.len())));
        }

        Ok(ObjFace { vertices, material })
    }

    /// OBJ indices are one based, negative values are relative to the end of the list so far.
    fn resolve_index(line: &KeywordLine<'_>, raw: &str, len: usize) -> Result<u32, ParserError> {
        let index = raw
            .parse::<i64>()
            .map_err(|_| line.error(format!("'{raw}' is not an index")))?;

        let resolved = match index {
            0 => None,
            i if i > 0 => Some(i - 1),
            i => Some(len as i64 + i),
        };

        match resolved {
            Some(idx) if idx >= 0 && (idx as usize) < len => Ok(idx as u32),
            _ => Err(line.error(format!("index {index} out of range (have {len})"))),
        }
    }
}
