//! Logical-line splitting and attribute-list scanning.
//!
//! An attribute list is a comma-separated sequence of `KEY=value` pairs
//! where a quoted value may itself contain commas. Two scanners are
//! provided: [`attributes`] keeps values verbatim (quotes and `0x` prefixes
//! included), which matters for attributes where quoting conveys meaning;
//! [`trimmed_attributes`] strips surrounding quotes and spaces for the
//! simple key/value tags.

use std::borrow::Cow;

use nom::{
    branch::alt,
    bytes::complete::{take_till, take_till1, take_while1},
    character::complete::char,
    combinator::{map, recognize},
    sequence::{delimited, separated_pair},
    IResult,
};

use crate::error::{PlaylistError, Result};
use crate::types::Attribute;

/// Iterator over logical playlist lines.
///
/// Terminators are `\n` or `\r\n`; the terminator is stripped. Blank lines
/// are yielded as empty strings and skipped by the decoder.
pub(crate) struct Lines<'a> {
    rest: &'a [u8],
}

pub(crate) fn lines(data: &[u8]) -> Lines<'_> {
    Lines { rest: data }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Cow<'a, str>;

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.rest;
        if data.is_empty() {
            return None;
        }
        let (line, rest) = match data.iter().position(|&b| b == b'\n') {
            Some(idx) => (&data[..idx], &data[idx + 1..]),
            None => (data, &data[data.len()..]),
        };
        self.rest = rest;
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };
        Some(String::from_utf8_lossy(line))
    }
}

fn attr_name(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')(i)
}

fn quoted_value(i: &str) -> IResult<&str, &str> {
    recognize(delimited(char('"'), take_till(|c| c == '"'), char('"')))(i)
}

fn bare_value(i: &str) -> IResult<&str, &str> {
    take_till1(|c| c == ',' || c == '"')(i)
}

fn attribute(i: &str) -> IResult<&str, Attribute> {
    map(
        separated_pair(attr_name, char('='), alt((quoted_value, bare_value))),
        |(key, value)| Attribute {
            key: key.to_string(),
            value: value.to_string(),
        },
    )(i)
}

/// Scans an attribute list, keeping values verbatim.
///
/// Quotes and `0x` prefixes are preserved. Content between recognizable
/// `KEY=value` pairs (separators, stray bytes) is skipped.
pub fn attributes(line: &str) -> Vec<Attribute> {
    let mut out = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        match attribute(rest) {
            Ok((tail, attr)) => {
                out.push(attr);
                rest = tail;
            }
            Err(_) => {
                let mut chars = rest.chars();
                chars.next();
                rest = chars.as_str();
            }
        }
    }
    out
}

/// Scans an attribute list, trimming quotes and spaces around values.
pub fn trimmed_attributes(line: &str) -> Vec<(String, String)> {
    attributes(line)
        .into_iter()
        .map(|a| {
            let value = a.value.trim_matches(|c| c == ' ' || c == '"').to_string();
            (a.key, value)
        })
        .collect()
}

/// Removes one pair of surrounding double quotes, if present.
pub(crate) fn dequote(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Parses an enumerated YES/NO attribute value.
///
/// Strict mode accepts exactly `YES` or `NO`; lax mode treats anything
/// that is not case-insensitive `YES` as `NO`.
pub(crate) fn yes_or_no(field: &str, value: &str, strict: bool) -> Result<bool> {
    if strict {
        match value {
            "YES" => Ok(true),
            "NO" => Ok(false),
            _ => Err(PlaylistError::NotYesOrNo {
                field: field.to_string(),
                value: value.to_string(),
            }),
        }
    } else {
        Ok(value.eq_ignore_ascii_case("YES"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"a\nb\r\nc", &["a", "b", "c"])]
    #[case(b"a\n\nb\n", &["a", "", "b"])]
    #[case(b"no-newline", &["no-newline"])]
    #[case(b"", &[])]
    fn splits_lines(#[case] data: &[u8], #[case] expected: &[&str]) {
        let got: Vec<_> = lines(data).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn scans_verbatim_values() {
        let attrs = attributes(r#"BANDWIDTH=1280000,CODECS="avc1.42c015,mp4a.40.2",IV=0x9c7db8778570d05c3177c349fd9236aa"#);
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].key, "BANDWIDTH");
        assert_eq!(attrs[0].value, "1280000");
        assert_eq!(attrs[1].value, r#""avc1.42c015,mp4a.40.2""#);
        assert_eq!(attrs[2].value, "0x9c7db8778570d05c3177c349fd9236aa");
    }

    #[test]
    fn quoted_values_keep_commas() {
        let attrs = trimmed_attributes(r#"X-RESTRICT="SKIP,JUMP",CLASS="a""#);
        assert_eq!(
            attrs,
            vec![
                ("X-RESTRICT".to_string(), "SKIP,JUMP".to_string()),
                ("CLASS".to_string(), "a".to_string()),
            ]
        );
    }

    #[test]
    fn base64_values_survive_bare_scan() {
        let attrs = trimmed_attributes(
            "ElapsedTime=8.844,Duration=15,SCTE35=/DAlAAAAAAAAAP/wFAUAAAABf+/+ANgNkv4AFJlwAAEBAQAA5xULLA==",
        );
        assert_eq!(attrs[2].0, "SCTE35");
        assert_eq!(
            attrs[2].1,
            "/DAlAAAAAAAAAP/wFAUAAAABf+/+ANgNkv4AFJlwAAEBAQAA5xULLA=="
        );
    }

    #[rstest]
    #[case(r#""quoted""#, "quoted")]
    #[case("bare", "bare")]
    #[case(r#""""#, "")]
    #[case(r#"""#, "\"")]
    fn dequotes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(dequote(input), expected);
    }

    #[rstest]
    #[case("YES", true, Some(true))]
    #[case("NO", true, Some(false))]
    #[case("YE", true, None)]
    #[case("yes", true, None)]
    #[case("yes", false, Some(true))]
    #[case("anything", false, Some(false))]
    fn yes_no(#[case] value: &str, #[case] strict: bool, #[case] expected: Option<bool>) {
        match (yes_or_no("DEFAULT", value, strict), expected) {
            (Ok(got), Some(want)) => assert_eq!(got, want),
            (Err(PlaylistError::NotYesOrNo { field, value: v }), None) => {
                assert_eq!(field, "DEFAULT");
                assert_eq!(v, value);
            }
            (got, want) => panic!("got {got:?}, want {want:?}"),
        }
    }

    #[test]
    fn yes_no_error_message_names_the_attribute() {
        let err = yes_or_no("DEFAULT", "YE", true).unwrap_err();
        assert_eq!(err.to_string(), "DEFAULT:YE value must be YES or NO");
    }
}
