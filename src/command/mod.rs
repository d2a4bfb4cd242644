// Command module - request tokens and the builders that render them

use crate::error::BuildError;
use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;

pub mod geo;

/// Anything that can be rendered to the bytes of a single protocol token.
///
/// Text and binary identifiers with the same content produce the same token,
/// so builders are generic over this capability instead of over `String` or
/// `Vec<u8>`.
pub trait ToArg {
    fn to_arg(&self) -> Bytes;
}

impl ToArg for str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> ToArg for [u8; N] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Bytes {
        (**self).to_arg()
    }
}

/// One fully rendered request: the command name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    tokens: Vec<Bytes>,
}

impl Command {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            tokens: vec![Bytes::from_static(name.as_bytes())],
        }
    }

    /// Build a command from arbitrary tokens, the first being the command name.
    pub fn raw<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToArg,
    {
        Self {
            tokens: tokens.into_iter().map(|t| t.to_arg()).collect(),
        }
    }

    pub(crate) fn arg(&mut self, arg: impl ToArg) -> &mut Self {
        self.tokens.push(arg.to_arg());
        self
    }

    pub(crate) fn keyword(&mut self, keyword: &'static str) -> &mut Self {
        self.tokens.push(Bytes::from_static(keyword.as_bytes()));
        self
    }

    pub(crate) fn float(&mut self, param: &'static str, value: f64) -> Result<&mut Self, BuildError> {
        self.tokens.push(format_float(param, value)?);
        Ok(self)
    }

    pub(crate) fn uint(&mut self, value: u64) -> &mut Self {
        self.tokens.push(Bytes::from(value.to_string()));
        self
    }

    /// Command name, e.g. `GEOADD`
    pub fn name(&self) -> Cow<'_, str> {
        match self.tokens.first() {
            Some(name) => String::from_utf8_lossy(name),
            None => Cow::Borrowed(""),
        }
    }

    /// All tokens including the command name
    pub fn tokens(&self) -> &[Bytes] {
        &self.tokens
    }

    /// Tokens after the command name
    pub fn args(&self) -> &[Bytes] {
        self.tokens.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens as (lossy) strings, mostly for logs and assertions
    pub fn to_strings(&self) -> Vec<String> {
        self.tokens
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect()
    }

    /// Exact size of the RESP encoding of this command
    pub fn encoded_len(&self) -> usize {
        let header = |len: usize| 1 + decimal_len(len) + 2;
        header(self.tokens.len())
            + self
                .tokens
                .iter()
                .map(|t| header(t.len()) + t.len() + 2)
                .sum::<usize>()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&String::from_utf8_lossy(token))?;
        }
        Ok(())
    }
}

fn decimal_len(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Render a float as the shortest decimal that parses back to the same value.
///
/// Rust's float formatting never consults the locale and never emits digit
/// grouping, which is what the server's ASCII number parser expects.
pub(crate) fn format_float(param: &'static str, value: f64) -> Result<Bytes, BuildError> {
    if !value.is_finite() {
        return Err(BuildError::invalid(param, format!("{} is not a finite number", value)));
    }
    Ok(Bytes::from(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_binary_args_match() {
        let text = Command::raw(["GEOPOS", "cities", "Palermo"]);
        let binary = Command::raw([b"GEOPOS".to_vec(), b"cities".to_vec(), b"Palermo".to_vec()]);
        let bytes = Command::raw([
            Bytes::from_static(b"GEOPOS"),
            Bytes::from_static(b"cities"),
            Bytes::from_static(b"Palermo"),
        ]);
        assert_eq!(text, binary);
        assert_eq!(text, bytes);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float("longitude", 13.361389).unwrap(), "13.361389");
        assert_eq!(format_float("latitude", -38.5).unwrap(), "-38.5");
        assert_eq!(format_float("radius", 200.0).unwrap(), "200");
        assert_eq!(format_float("radius", 0.1 + 0.2).unwrap(), "0.30000000000000004");
    }

    #[test]
    fn test_format_float_rejects_non_finite() {
        let err = format_float("longitude", f64::NAN).unwrap_err();
        assert_eq!(err.param(), "longitude");
        assert!(format_float("radius", f64::INFINITY).is_err());
    }

    #[test]
    fn test_name_and_args() {
        let mut cmd = Command::new("GEODIST");
        cmd.arg("cities").arg("Palermo").arg(b"Catania").uint(7);
        assert_eq!(cmd.name(), "GEODIST");
        assert_eq!(cmd.args().len(), 4);
        assert_eq!(cmd.to_string(), "GEODIST cities Palermo Catania 7");
    }

    #[test]
    fn test_empty_raw_command() {
        let cmd = Command::raw(Vec::<String>::new());
        assert!(cmd.is_empty());
        assert_eq!(cmd.name(), "");
        assert!(cmd.args().is_empty());
    }

    #[test]
    fn test_encoded_len() {
        assert_eq!(Command::raw(["PING"]).encoded_len(), b"*1\r\n$4\r\nPING\r\n".len());
        let long = Command::raw(vec!["x"; 12]);
        assert_eq!(long.encoded_len(), 5 + 12 * 7);
    }
}
