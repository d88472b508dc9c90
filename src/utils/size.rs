use std::convert::TryFrom;

use nom::{
    branch::alt, bytes::complete::tag_no_case, character::complete::digit1, combinator::opt,
};
use nom_locate::LocatedSpan;

use crate::error::{Error, Result};

type Span<'a> = LocatedSpan<&'a str>;

type IResult<'a, O> = nom::IResult<Span<'a>, O, SizeError>;

/// Why a size was rejected, and the byte offset it was rejected at.
#[derive(Debug, PartialEq)]
struct SizeError {
    message: String,
    offset: usize,
}

impl SizeError {
    fn at(message: impl Into<String>, span: Span) -> nom::Err<Self> {
        nom::Err::Failure(Self {
            message: message.into(),
            offset: span.location_offset(),
        })
    }
}

impl<'a> nom::error::ParseError<Span<'a>> for SizeError {
    fn from_error_kind(input: Span<'a>, kind: nom::error::ErrorKind) -> Self {
        Self {
            message: format!("parse error {:?}", kind),
            offset: input.location_offset(),
        }
    }

    fn append(_input: Span<'a>, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

pub fn parse_size(s: &str) -> Result<usize> {
    let e = match size(Span::new(s)) {
        Ok((_, n)) => return Ok(n),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => e,
        Err(nom::Err::Incomplete(_)) => SizeError {
            message: "incomplete size".to_owned(),
            offset: s.len(),
        },
    };
    Err(Error::Parse {
        what: "size",
        message: e.message,
        offset: e.offset,
    })
}

/// Parse a byte count: `512`, `16k`, `16KiB`, `100MB`, `1g`.
/// - Only positive sizes.
/// - Decimal units (`k`, `kb`) are powers of 1000, binary ones (`kib`) of 1024.
/// - Units are case-insensitive.
fn size(input: Span) -> IResult<usize> {
    let (rest, digits) =
        digit1(input).map_err(|_: nom::Err<SizeError>| SizeError::at("expected a number", input))?;

    let (rest, unit) = opt(alt((
        tag_no_case("kib"),
        tag_no_case("kb"),
        tag_no_case("k"),
        tag_no_case("mib"),
        tag_no_case("mb"),
        tag_no_case("m"),
        tag_no_case("gib"),
        tag_no_case("gb"),
        tag_no_case("g"),
        tag_no_case("b"),
    )))(rest)?;

    if !rest.fragment().is_empty() {
        return Err(SizeError::at(
            format!("unknown size unit '{}'", rest.fragment()),
            rest,
        ));
    }

    let unit = match unit {
        Some(unit) => Unit::try_from(*unit.fragment())
            .map_err(|e| SizeError::at(e.to_string(), unit))?,
        None => Unit::Byte,
    };

    let size = digits
        .fragment()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(unit.bytes()))
        .ok_or_else(|| SizeError::at("size overflow", input))?;

    if size == 0 {
        return Err(SizeError::at("size must be greater than 0", input));
    }

    Ok((rest, size))
}

enum Unit {
    Byte,
    Kilobyte,
    Kibibyte,
    Megabyte,
    Mebibyte,
    Gigabyte,
    Gibibyte,
}

impl Unit {
    fn bytes(&self) -> usize {
        use Unit::*;
        match self {
            Byte => 1,
            Kilobyte => 1000,
            Kibibyte => 1 << 10,
            Megabyte => 1000 * 1000,
            Mebibyte => 1 << 20,
            Gigabyte => 1000 * 1000 * 1000,
            Gibibyte => 1 << 30,
        }
    }
}

impl TryFrom<&str> for Unit {
    type Error = Error;

    fn try_from(u: &str) -> Result<Self> {
        use Unit::*;

        match u.to_ascii_lowercase().as_str() {
            "b" => Ok(Byte),
            "k" | "kb" => Ok(Kilobyte),
            "kib" => Ok(Kibibyte),
            "m" | "mb" => Ok(Megabyte),
            "mib" => Ok(Mebibyte),
            "g" | "gb" => Ok(Gigabyte),
            "gib" => Ok(Gibibyte),
            _ => Err(Error::invalid_configuration("unknown size unit")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_size() -> Result<()> {
        #[rustfmt::skip]
        let tests = [
            ("1", 1),
            ("512", 512),
            ("512b", 512),
            ("16k", 16_000),
            ("16KB", 16_000),
            ("16KiB", 16_384),
            ("32kib", 32_768),
            ("100MB", 100_000_000),
            ("100MiB", 100 * 1024 * 1024),
            ("1g", 1_000_000_000),
            ("1GiB", 1 << 30),
        ];

        for (input, expected) in &tests {
            assert_eq!(*expected, parse_size(input)?, "while parsing {}", input);
        }
        Ok(())
    }

    #[test]
    fn test_invalid_size() {
        #[rustfmt::skip]
        let tests = [
            ("",      "expected a number", 0),
            ("foo",   "expected a number", 0),
            ("0",     "size must be greater than 0", 0),
            ("0KiB",  "size must be greater than 0", 0),
            ("10x",   "unknown size unit 'x'", 2),
            ("10 kb", "unknown size unit ' kb'", 2),
            ("10kbs", "unknown size unit 's'", 4),
            ("99999999999999999999999", "size overflow", 0),
        ];

        for (input, message, offset) in &tests {
            match parse_size(input) {
                Err(Error::Parse {
                    message: m,
                    offset: o,
                    ..
                }) => {
                    assert_eq!(*message, m, "while parsing {}", input);
                    assert_eq!(*offset, o, "while parsing {}", input);
                }
                ret => panic!("Expected parse error, got {:?} while parsing {}", ret, input),
            }
        }
    }
}
