//! Text rendering of output records
//!
//! One line per record:
//!
//! - `raw`: the serialized record
//! - `fields`: the projected fields joined by the field delimiter
//! - `both`: the projected fields, the delimiter, then the serialized record

use std::io::{self, Write};

use sluice_pipeline::{OutputMode, OutputRecord};

/// Renders output records as newline-terminated lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    mode: OutputMode,
    delimiter: Vec<u8>,
}

impl LineFormat {
    /// Format for `mode`, joining fields with `delimiter`
    pub fn new(mode: OutputMode, delimiter: impl Into<Vec<u8>>) -> Self {
        Self {
            mode,
            delimiter: delimiter.into(),
        }
    }

    /// Projection this format reads
    #[inline]
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Write one record as a line, returning the bytes written
    pub fn write<W: Write>(&self, out: &mut W, record: &OutputRecord) -> io::Result<usize> {
        let mut written = 0;

        if self.mode.needs_fields() {
            for (i, field) in record.fields.iter().enumerate() {
                if i > 0 {
                    out.write_all(&self.delimiter)?;
                    written += self.delimiter.len();
                }
                out.write_all(field)?;
                written += field.len();
            }
        }

        if self.mode.needs_raw() {
            if self.mode.needs_fields() {
                out.write_all(&self.delimiter)?;
                written += self.delimiter.len();
            }
            if let Some(raw) = &record.raw {
                out.write_all(raw)?;
                written += raw.len();
            }
        }

        out.write_all(b"\n")?;
        Ok(written + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn record() -> OutputRecord {
        OutputRecord {
            fields: vec![Bytes::from_static(b"a"), Bytes::new(), Bytes::from_static(b"c")],
            raw: Some(Bytes::from_static(b"a,,c,d")),
        }
    }

    fn render(format: &LineFormat) -> String {
        let mut out = Vec::new();
        let n = format.write(&mut out, &record()).unwrap();
        assert_eq!(n, out.len());
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_raw_line() {
        assert_eq!(render(&LineFormat::new(OutputMode::Raw, "\t")), "a,,c,d\n");
    }

    #[test]
    fn test_fields_line_keeps_empty_fields() {
        assert_eq!(render(&LineFormat::new(OutputMode::Fields, "\t")), "a\t\tc\n");
    }

    #[test]
    fn test_both_line() {
        assert_eq!(render(&LineFormat::new(OutputMode::Both, "|")), "a||c|a,,c,d\n");
    }

    #[test]
    fn test_missing_raw_is_an_empty_line() {
        let format = LineFormat::new(OutputMode::Raw, "\t");
        let mut out = Vec::new();
        format.write(&mut out, &OutputRecord::default()).unwrap();
        assert_eq!(out, b"\n");
    }
}
