//! Parsing of literal vectors given on the command line.

use anyhow::{bail, Context, Result};
use half::f16;
use vecmetric_core::{DataType, VectorView};

/// A parsed vector owning its elements.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedVector {
    F64(Vec<f64>),
    F32(Vec<f32>),
    F16(Vec<f16>),
    I8(Vec<i8>),
    B1(Vec<u8>),
}

impl OwnedVector {
    /// Parses `text` as elements of `datatype`.
    ///
    /// Elements are separated by commas and/or whitespace; surrounding
    /// brackets are ignored. `b1` bytes accept `0x` and `0b` prefixes.
    pub fn parse(datatype: DataType, text: &str) -> Result<Self> {
        let fields = fields(text);
        let vector = match datatype {
            DataType::F64 => Self::F64(parse_each(&fields, |s| s.parse::<f64>().ok())?),
            DataType::F32 => Self::F32(parse_each(&fields, |s| s.parse::<f32>().ok())?),
            DataType::F16 => Self::F16(parse_each(&fields, |s| {
                s.parse::<f32>().ok().map(f16::from_f32)
            })?),
            DataType::I8 => Self::I8(parse_each(&fields, |s| s.parse::<i8>().ok())?),
            DataType::B1 => Self::B1(parse_each(&fields, parse_byte)?),
        };
        Ok(vector)
    }

    #[must_use]
    pub fn view(&self) -> VectorView<'_> {
        match self {
            Self::F64(v) => VectorView::F64(v),
            Self::F32(v) => VectorView::F32(v),
            Self::F16(v) => VectorView::F16(v),
            Self::I8(v) => VectorView::I8(v),
            Self::B1(v) => VectorView::B1(v),
        }
    }
}

fn fields(text: &str) -> Vec<&str> {
    text.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_each<T>(fields: &[&str], parse: impl Fn(&str) -> Option<T>) -> Result<Vec<T>> {
    fields
        .iter()
        .enumerate()
        .map(|(i, s)| parse(s).with_context(|| format!("element {i}: invalid value '{s}'")))
        .collect()
}

fn parse_byte(s: &str) -> Option<u8> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(&hex.replace('_', ""), 16).ok()
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u8::from_str_radix(&bin.replace('_', ""), 2).ok()
    } else {
        s.parse().ok()
    }
}

/// Parses both operands and checks they have the same dimension.
pub fn parse_pair(datatype: DataType, a: &str, b: &str) -> Result<(OwnedVector, OwnedVector)> {
    let left = OwnedVector::parse(datatype, a).context("first vector")?;
    let right = OwnedVector::parse(datatype, b).context("second vector")?;
    let (l, r) = (left.view().len(), right.view().len());
    if l != r {
        bail!("vectors have different dimensions: {l} vs {r}");
    }
    Ok((left, right))
}
