//! Kubernetes resource quantity parsing
//!
//! Converts the textual quantities reported by the API server into two
//! normalized dimensions: CPU as fractional cores and memory as whole
//! kibibytes. Each dimension has its own newtype so cores and kibibytes can
//! never be added to or compared with each other.

use crate::error::FormatError;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Unit dimension of a normalized quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Cpu,
    Memory,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Cpu => "cpu",
            Dimension::Memory => "memory",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quantity as handed over by a collaborator: already numeric, or text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawQuantity {
    Int(i64),
    Text(String),
}

impl From<i64> for RawQuantity {
    fn from(value: i64) -> Self {
        RawQuantity::Int(value)
    }
}

impl From<i32> for RawQuantity {
    fn from(value: i32) -> Self {
        RawQuantity::Int(value.into())
    }
}

impl From<u32> for RawQuantity {
    fn from(value: u32) -> Self {
        RawQuantity::Int(value.into())
    }
}

impl From<&str> for RawQuantity {
    fn from(value: &str) -> Self {
        RawQuantity::Text(value.to_string())
    }
}

impl From<String> for RawQuantity {
    fn from(value: String) -> Self {
        RawQuantity::Text(value)
    }
}

impl From<&String> for RawQuantity {
    fn from(value: &String) -> Self {
        RawQuantity::Text(value.clone())
    }
}

impl From<&Quantity> for RawQuantity {
    fn from(value: &Quantity) -> Self {
        RawQuantity::Text(value.0.clone())
    }
}

/// Memory suffixes that are powers of 1024, as multipliers in KiB
const BINARY_SUFFIXES: &[(&str, i64)] = &[
    ("Ki", 1),
    ("Mi", 1024),
    ("Gi", 1024 * 1024),
    ("Ti", 1024 * 1024 * 1024),
];

/// Memory suffixes that are powers of 1000, as multipliers in bytes
const DECIMAL_SUFFIXES: &[(&str, i64)] = &[
    ("K", 1_000),
    ("k", 1_000),
    ("M", 1_000_000),
    ("m", 1_000_000),
    ("G", 1_000_000_000),
    ("g", 1_000_000_000),
];

const BYTES_PER_KIB: i64 = 1024;

/// Parse a CPU quantity into cores.
///
/// Plain numbers are cores; a trailing `m` means millicores. Any other
/// suffix is rejected.
pub fn parse_cpu(input: impl Into<RawQuantity>) -> Result<f64, FormatError> {
    match input.into() {
        RawQuantity::Int(cores) => Ok(cores as f64),
        RawQuantity::Text(text) => parse_cpu_text(&text),
    }
}

fn parse_cpu_text(raw: &str) -> Result<f64, FormatError> {
    let text = raw.trim();
    let (number, divisor) = match text.strip_suffix('m') {
        Some(millis) => (millis, 1000.0),
        None => (text, 1.0),
    };

    let value: f64 = number.parse().map_err(|_| {
        FormatError::new(
            Dimension::Cpu.as_str(),
            raw,
            "expected cores or millicores (e.g. '2', '0.5', '500m')",
        )
    })?;

    if !value.is_finite() {
        return Err(FormatError::new(Dimension::Cpu.as_str(), raw, "value is not finite"));
    }

    Ok(value / divisor)
}

/// Parse a memory quantity into kibibytes.
///
/// Binary suffixes (`Ki`, `Mi`, `Gi`, `Ti`) scale exactly. Decimal suffixes
/// (`K`/`k`, `M`/`m`, `G`/`g`) scale to bytes first and are then
/// floor-divided into KiB, the same truncation Kubernetes applies. A bare
/// integer is bytes.
pub fn parse_memory(input: impl Into<RawQuantity>) -> Result<i64, FormatError> {
    match input.into() {
        RawQuantity::Int(bytes) => Ok(bytes.div_euclid(BYTES_PER_KIB)),
        RawQuantity::Text(text) => parse_memory_text(&text),
    }
}

fn parse_memory_text(raw: &str) -> Result<i64, FormatError> {
    let text = raw.trim();

    for (suffix, kib) in BINARY_SUFFIXES {
        if let Some(number) = text.strip_suffix(suffix) {
            let value = parse_integer(number, raw)?;
            return value.checked_mul(*kib).ok_or_else(|| overflow(raw));
        }
    }

    for (suffix, bytes) in DECIMAL_SUFFIXES {
        if let Some(number) = text.strip_suffix(suffix) {
            let value = parse_integer(number, raw)?;
            let total = value.checked_mul(*bytes).ok_or_else(|| overflow(raw))?;
            return Ok(total.div_euclid(BYTES_PER_KIB));
        }
    }

    let bytes = text.parse::<i64>().map_err(|_| {
        FormatError::new(
            Dimension::Memory.as_str(),
            raw,
            "unrecognized suffix (expected Ki, Mi, Gi, Ti, K, M, G or plain bytes)",
        )
    })?;
    Ok(bytes.div_euclid(BYTES_PER_KIB))
}

fn parse_integer(number: &str, raw: &str) -> Result<i64, FormatError> {
    number.trim().parse::<i64>().map_err(|_| {
        FormatError::new(
            Dimension::Memory.as_str(),
            raw,
            "expected an integer before the unit suffix",
        )
    })
}

fn overflow(raw: &str) -> FormatError {
    FormatError::new(Dimension::Memory.as_str(), raw, "value out of range")
}

/// CPU amount in cores
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CpuCores(pub f64);

impl CpuCores {
    pub fn parse(input: impl Into<RawQuantity>) -> Result<Self, FormatError> {
        parse_cpu(input).map(CpuCores)
    }

    pub fn cores(&self) -> f64 {
        self.0
    }
}

impl Add for CpuCores {
    type Output = CpuCores;

    fn add(self, rhs: CpuCores) -> CpuCores {
        CpuCores(self.0 + rhs.0)
    }
}

impl Sub for CpuCores {
    type Output = CpuCores;

    fn sub(self, rhs: CpuCores) -> CpuCores {
        CpuCores(self.0 - rhs.0)
    }
}

impl Sum for CpuCores {
    fn sum<I: Iterator<Item = CpuCores>>(iter: I) -> Self {
        iter.fold(CpuCores::default(), Add::add)
    }
}

impl fmt::Display for CpuCores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Memory amount in kibibytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryKib(pub i64);

impl MemoryKib {
    pub fn parse(input: impl Into<RawQuantity>) -> Result<Self, FormatError> {
        parse_memory(input).map(MemoryKib)
    }

    pub fn kib(&self) -> i64 {
        self.0
    }

    /// Size in GiB, the unit user-facing thresholds are expressed in
    pub fn as_gib(&self) -> f64 {
        self.0 as f64 / (1024.0 * 1024.0)
    }
}

impl Add for MemoryKib {
    type Output = MemoryKib;

    fn add(self, rhs: MemoryKib) -> MemoryKib {
        MemoryKib(self.0 + rhs.0)
    }
}

impl Sub for MemoryKib {
    type Output = MemoryKib;

    fn sub(self, rhs: MemoryKib) -> MemoryKib {
        MemoryKib(self.0 - rhs.0)
    }
}

impl Sum for MemoryKib {
    fn sum<I: Iterator<Item = MemoryKib>>(iter: I) -> Self {
        iter.fold(MemoryKib::default(), Add::add)
    }
}

impl fmt::Display for MemoryKib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}GB", self.as_gib())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_millicores() {
        assert_eq!(parse_cpu("500m").unwrap(), 0.5);
        assert_eq!(parse_cpu("250m").unwrap(), 0.25);
        assert_eq!(parse_cpu("1500m").unwrap(), 1.5);
    }

    #[test]
    fn test_parse_cpu_plain_numbers() {
        assert_eq!(parse_cpu(2).unwrap(), 2.0);
        assert_eq!(parse_cpu("2").unwrap(), 2.0);
        assert_eq!(parse_cpu("0.5").unwrap(), 0.5);
    }

    #[test]
    fn test_parse_cpu_rejects_other_suffixes() {
        let err = parse_cpu("2k").unwrap_err();
        assert_eq!(err.dimension, "cpu");
        assert_eq!(err.input, "2k");

        assert!(parse_cpu("100n").is_err());
        assert!(parse_cpu("").is_err());
        assert!(parse_cpu("inf").is_err());
    }

    #[test]
    fn test_parse_memory_binary_units() {
        assert_eq!(parse_memory("1Ki").unwrap(), 1);
        assert_eq!(parse_memory("1Mi").unwrap(), 1024);
        assert_eq!(parse_memory("1Gi").unwrap(), 1024 * 1024);
        assert_eq!(parse_memory("16Gi").unwrap(), 16 * 1024 * 1024);
        assert_eq!(parse_memory("1Ti").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_memory("32863764Ki").unwrap(), 32_863_764);
    }

    #[test]
    fn test_parse_memory_decimal_units_truncate() {
        assert_eq!(parse_memory("1000M").unwrap(), 1000 * 1000 * 1000 / 1024);
        assert_eq!(parse_memory("1000m").unwrap(), 1000 * 1000 * 1000 / 1024);
        // 1000 bytes is less than a KiB
        assert_eq!(parse_memory("1K").unwrap(), 0);
        assert_eq!(parse_memory("2k").unwrap(), 1);
        // 1e9 / 1024 = 976562.5, truncated
        assert_eq!(parse_memory("1G").unwrap(), 976_562);
        assert_eq!(parse_memory("1g").unwrap(), 976_562);
    }

    #[test]
    fn test_parse_memory_plain_bytes() {
        assert_eq!(parse_memory(2048).unwrap(), 2);
        assert_eq!(parse_memory("2048").unwrap(), 2);
        assert_eq!(parse_memory("1023").unwrap(), 0);
        assert_eq!(parse_memory("134217728").unwrap(), 131_072);
    }

    #[test]
    fn test_parse_memory_rejects_unknown_suffix() {
        let err = parse_memory("5Pi").unwrap_err();
        assert_eq!(err.dimension, "memory");
        assert!(parse_memory("1.5Gi").is_err());
        assert!(parse_memory("Gi").is_err());
        assert!(parse_memory("lots").is_err());
    }

    #[test]
    fn test_parse_memory_overflow_is_format_error() {
        assert!(parse_memory("9223372036854775807Ti").is_err());
    }

    #[test]
    fn test_quantity_from_k8s() {
        let q = Quantity("8".to_string());
        assert_eq!(parse_cpu(&q).unwrap(), 8.0);
        let q = Quantity("32Gi".to_string());
        assert_eq!(parse_memory(&q).unwrap(), 32 * 1024 * 1024);
    }

    #[test]
    fn test_newtype_arithmetic_stays_in_dimension() {
        let total: CpuCores = [CpuCores(8.0), CpuCores(8.0), CpuCores(8.0)].into_iter().sum();
        assert_eq!(total - CpuCores(10.0), CpuCores(14.0));

        let mem: MemoryKib = [MemoryKib(1024), MemoryKib(2048)].into_iter().sum();
        assert_eq!(mem, MemoryKib(3072));
        assert_eq!(MemoryKib(1024 * 1024).as_gib(), 1.0);
        assert_eq!(MemoryKib(16 * 1024 * 1024).to_string(), "16.0GB");
    }
}
