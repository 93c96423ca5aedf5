//! Two-line element records and the text ingestion parser

use super::Regime;

/// Exact length of a TLE data line
pub const TLE_LINE_LEN: usize = 69;

/// Identity of a tracked object (NORAD catalog number as written in line 1)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reason a name/line1/line2 group was rejected at ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    EmptyName,
    BadLength { line: u8, len: usize },
    BadPrefix { line: u8 },
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Element set has an empty name"),
            Self::BadLength { line, len } => {
                write!(f, "Line {} is {} characters, expected {}", line, len, TLE_LINE_LEN)
            }
            Self::BadPrefix { line } => write!(f, "Line {} does not start with \"{} \"", line, line),
        }
    }
}

impl std::error::Error for IngestError {}

/// A validated orbital element set. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElementRecord {
    name: String,
    line1: String,
    line2: String,
    regime: Regime,
}

impl OrbitalElementRecord {
    /// Validate and build a record.
    ///
    /// Trailing whitespace (including `\r`) is stripped from the data lines
    /// before the length check; the name is trimmed on both sides.
    pub fn new(name: &str, line1: &str, line2: &str) -> Result<Self, IngestError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IngestError::EmptyName);
        }
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();
        check_line(line1, 1)?;
        check_line(line2, 2)?;

        Ok(Self {
            name: name.to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
            regime: Regime::classify(line2),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Catalog number field, line 1 columns 3-7
    pub fn id(&self) -> ObjectId {
        let field = self.line1.get(2..7).unwrap_or_default().trim();
        ObjectId(field.to_string())
    }
}

fn check_line(line: &str, number: u8) -> Result<(), IngestError> {
    let len = line.chars().count();
    if len != TLE_LINE_LEN {
        return Err(IngestError::BadLength { line: number, len });
    }
    let prefix = if number == 1 { "1 " } else { "2 " };
    if !line.starts_with(prefix) {
        return Err(IngestError::BadPrefix { line: number });
    }
    Ok(())
}

/// Outcome of parsing a text response
#[derive(Debug, Default)]
pub struct ParseReport {
    pub records: Vec<OrbitalElementRecord>,
    pub rejected: usize,
}

/// Parse a multi-object response in stride-3 `[name, line1, line2]` groups.
///
/// Groups failing validation are dropped and counted. A trailing partial
/// group is ignored.
pub fn parse_element_sets(text: &str) -> ParseReport {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut report = ParseReport::default();

    for group in lines.chunks_exact(3) {
        match OrbitalElementRecord::new(group[0], group[1], group[2]) {
            Ok(record) => report.records.push(record),
            Err(e) => {
                log::debug!("Dropping element set {:?}: {}", group[0].trim(), e);
                report.rejected += 1;
            }
        }
    }

    report
}

/// Parse a single-object response: exactly the first three lines form the record
pub fn parse_single_element_set(text: &str) -> Option<OrbitalElementRecord> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let (name, line1, line2) = (lines.next()?, lines.next()?, lines.next()?);
    match OrbitalElementRecord::new(name, line1, line2) {
        Ok(record) => Some(record),
        Err(e) => {
            log::debug!("Dropping single element set {:?}: {}", name.trim(), e);
            None
        }
    }
}
