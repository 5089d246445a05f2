use std::io::BufRead;

use crate::ParserError;
use crate::common::reader::{KeywordLine, for_each_keyword_line};
use crate::mtl::types::{MtlAsset, MtlMaterial};

pub struct MtlReader {}

impl MtlReader {
    pub fn parse_asset<R: BufRead>(rdr: &mut R) -> Result<MtlAsset, ParserError> {
        let mut asset = MtlAsset::default();

        for_each_keyword_line(rdr, |mut line| {
            if line.keyword == "newmtl" {
                if line.rest.is_empty() {
                    return Err(line.error("newmtl without a name"));
                }
                asset.materials.push(MtlMaterial::new(line.rest.to_string()));
                return Ok(());
            }

            // Statements before the first newmtl have nothing to attach to
            let Some(material) = asset.materials.last_mut() else {
                return Ok(());
            };

            match line.keyword {
                "Ka" => material.ambient = Some(Self::color(&mut line)?),
                "Kd" => material.diffuse = Some(Self::color(&mut line)?),
                "Ks" => material.specular = Some(Self::color(&mut line)?),
                "Ns" => material.shininess = Some(line.next_f32()?),
                "d" => material.dissolve = Some(line.next_f32()?),
                "Tr" => material.dissolve = Some(1.0 - line.next_f32()?),
                "map_Kd" => {
                    // options like `-s 1 1 1` precede the file name, which is always last
                    material.diffuse_map = line.rest.split_whitespace().last().map(str::to_string);
                }
                _ => {}
            }
            Ok(())
        })?;

        Ok(asset)
    }

    /// `Kd r [g b]`, a single component means grey.
    fn color(line: &mut KeywordLine<'_>) -> Result<[f32; 3], ParserError> {
        let r = line.next_f32()?;
        let g = line.next_f32_or(r)?;
        let b = line.next_f32_or(r)?;
        Ok([r, g, b])
    }
}
