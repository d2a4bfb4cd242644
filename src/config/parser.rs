// Parser for redis.conf style files
//
// One `key value` directive per line. Blank lines and lines starting with
// `#` are ignored. A value may be wrapped in double quotes to keep spaces.

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub line: usize,
    pub key: String,
    pub value: String,
}

pub struct ConfigParser<'a> {
    content: &'a str,
}

impl<'a> ConfigParser<'a> {
    pub fn new(content: &'a str) -> Self {
        Self { content }
    }

    pub fn parse(&self) -> Result<Vec<Directive>> {
        let mut directives = Vec::new();

        for (index, raw) in self.content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line_no = index + 1;
            let (key, rest) = match line.split_once(char::is_whitespace) {
                Some((key, rest)) => (key, rest.trim()),
                None => bail!("line {}: directive '{}' has no value", line_no, line),
            };

            directives.push(Directive {
                line: line_no,
                key: key.to_lowercase(),
                value: Self::unquote(rest, line_no)?,
            });
        }

        Ok(directives)
    }

    fn unquote(value: &str, line_no: usize) -> Result<String> {
        match value.strip_prefix('"') {
            Some(inner) => match inner.strip_suffix('"') {
                Some(inner) => Ok(inner.replace("\\\"", "\"")),
                None => bail!("line {}: unterminated quoted value", line_no),
            },
            None => Ok(value.to_string()),
        }
    }
}
