use std::io::BufRead;

use crate::ParserError;
use crate::common::types::C3Vector;
use crate::wall_trace::types::WallTraceAsset;

pub struct WallTraceReader {}

impl WallTraceReader {
    /// One point per line as `x,y,z` (whitespace separation works as well), `#` starts a comment
    /// and a blank line closes the current segment.
    pub fn parse_asset<R: BufRead>(rdr: &mut R) -> Result<WallTraceAsset, ParserError> {
        let mut asset = WallTraceAsset::default();
        let mut current: Vec<C3Vector> = Vec::new();
        let mut buf = String::new();
        let mut number = 0;

        loop {
            buf.clear();
            if rdr.read_line(&mut buf)? == 0 {
                break;
            }
            number += 1;

            let content = match buf.find('#') {
                Some(idx) => &buf[..idx],
                None => buf.as_str(),
            }
            .trim();

            if content.is_empty() {
                // pure comment lines don't split a segment
                if !buf.trim_start().starts_with('#') && !current.is_empty() {
                    asset.segments.push(std::mem::take(&mut current));
                }
                continue;
            }

            current.push(Self::parse_point(content, number)?);
        }

        if !current.is_empty() {
            asset.segments.push(current);
        }

        if asset.segments.is_empty() {
            return Err(ParserError::EmptySource);
        }

        Ok(asset)
    }

    fn parse_point(content: &str, line: usize) -> Result<C3Vector, ParserError> {
        let components = content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<f32>().map_err(|_| ParserError::LineError {
                    line,
                    reason: format!("'{part}' is not a number"),
                })
            })
            .collect::<Result<Vec<f32>, ParserError>>()?;

        match components.as_slice() {
            [x, y, z] => Ok(C3Vector::new(*x, *y, *z)),
            _ => Err(ParserError::LineError {
                line,
                reason: format!("expected 3 components, got {}", components.len()),
            }),
        }
    }
}
