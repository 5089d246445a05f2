use std::io::BufRead;
use std::str::SplitWhitespace;

use crate::ParserError;
use crate::common::types::{C2Vector, C3Vector};

/// A line of a line-oriented text format (OBJ, MTL) split into keyword and arguments.
/// Comments (`#`) and blank lines never reach the consumer.
pub(crate) struct KeywordLine<'a> {
    pub number: usize,
    pub keyword: &'a str,
    pub args: SplitWhitespace<'a>,
    pub rest: &'a str,
}

impl KeywordLine<'_> {
    pub fn error(&self, reason: impl Into<String>) -> ParserError {
        ParserError::LineError {
            line: self.number,
            reason: reason.into(),
        }
    }

    pub fn next_f32(&mut self) -> Result<f32, ParserError> {
        let number = self.number;
        let keyword = self.keyword;
        let token = self.args.next().ok_or_else(|| ParserError::LineError {
            line: number,
            reason: format!("missing component for '{keyword}'"),
        })?;

        token.parse::<f32>().map_err(|_| ParserError::LineError {
            line: number,
            reason: format!("'{token}' is not a number"),
        })
    }

    pub fn next_f32_or(&mut self, default: f32) -> Result<f32, ParserError> {
        match self.args.clone().next() {
            Some(_) => self.next_f32(),
            None => Ok(default),
        }
    }

    pub fn c3vector(&mut self) -> Result<C3Vector, ParserError> {
        Ok(C3Vector {
            x: self.next_f32()?,
            y: self.next_f32()?,
            z: self.next_f32()?,
        })
    }

    pub fn c2vector(&mut self) -> Result<C2Vector, ParserError> {
        Ok(C2Vector {
            x: self.next_f32()?,
            // some exporters write 1D texture coordinates
            y: self.next_f32_or(0.0)?,
        })
    }
}

/// Feeds every meaningful line of `rdr` into `visit`, stopping at the first error.
pub(crate) fn for_each_keyword_line<R, F>(rdr: &mut R, mut visit: F) -> Result<(), ParserError>
where
    R: BufRead,
    F: FnMut(KeywordLine<'_>) -> Result<(), ParserError>,
{
    let mut buf = String::new();
    let mut number = 0;

    loop {
        buf.clear();
        if rdr.read_line(&mut buf)? == 0 {
            return Ok(());
        }
        number += 1;

        let content = match buf.find('#') {
            Some(idx) => &buf[..idx],
            None => buf.as_str(),
        }
        .trim();

        if content.is_empty() {
            continue;
        }

        let (keyword, rest) = match content.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (content, ""),
        };

        visit(KeywordLine {
            number,
            keyword,
            args: rest.split_whitespace(),
            rest,
        })?;
    }
}
