//! Text dumps of generations and decisions.
//!
//! Belief dump: for each frame, R consecutive two-line records. The first line
//! holds the confidence as a real number, the second a bracketed,
//! comma-separated heading list (`[0.04, 0.04, ...]`). The raw evidence dump
//! uses the same layout with the match count as confidence.
//!
//! Decision dump: two lines per frame, best location then best heading.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use nalgebra::DVector;

use crate::belief::{Belief, Decision, Generation};
use crate::error::{LocalizationError, Result};

/// Format a heading vector as a bracketed list.
pub fn format_headings(headings: &DVector<f64>) -> String {
    let values: Vec<String> = headings.iter().map(|v| format!("{:?}", v)).collect();
    format!("[{}]", values.join(", "))
}

/// Append one frame's generation to a belief dump.
pub fn write_generation<W: Write>(out: &mut W, generation: &Generation) -> Result<()> {
    for belief in generation.iter() {
        writeln!(out, "{:?}", belief.confidence())?;
        writeln!(out, "{}", format_headings(belief.headings()))?;
    }
    Ok(())
}

/// Append one frame's decision to a decision dump.
pub fn write_decision<W: Write>(out: &mut W, decision: &Decision) -> Result<()> {
    writeln!(out, "{}", decision.location)?;
    writeln!(out, "{}", decision.heading)?;
    Ok(())
}

/// Read a belief dump from disk.
pub fn load_belief_dump<P: AsRef<Path>>(
    path: P,
    num_locations: usize,
    num_bins: Option<usize>,
) -> Result<Vec<Generation>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_belief_dump(
        BufReader::new(file),
        &path.display().to_string(),
        num_locations,
        num_bins,
    )
}

/// Parse a belief dump: lines are chunked in twos, then every `num_locations`
/// chunks form one frame. When `num_bins` is `None` the first record fixes it.
pub fn read_belief_dump<R: BufRead>(
    reader: R,
    source_name: &str,
    num_locations: usize,
    num_bins: Option<usize>,
) -> Result<Vec<Generation>> {
    if num_locations == 0 {
        return Err(LocalizationError::InvalidConfig(
            "belief dump needs at least one location per frame".to_string(),
        ));
    }

    let lines = read_lines(reader)?;
    let mut num_bins = num_bins;
    let mut frames = Vec::new();
    let mut beliefs = Vec::with_capacity(num_locations);

    for record in lines.chunks(2) {
        let (conf_no, conf_line) = &record[0];
        let Some((head_no, head_line)) = record.get(1) else {
            return Err(LocalizationError::malformed(
                source_name,
                *conf_no,
                "record is missing its heading line",
                conf_line.as_str(),
            ));
        };

        let confidence = parse_value(source_name, *conf_no, conf_line)?;
        let headings = parse_heading_list(source_name, *head_no, head_line)?;

        match num_bins {
            Some(expected) if expected != headings.len() => {
                return Err(LocalizationError::DimensionMismatch {
                    context: "belief dump heading bins",
                    expected,
                    actual: headings.len(),
                });
            }
            Some(_) => {}
            None => num_bins = Some(headings.len()),
        }

        beliefs.push(Belief::new(confidence, DVector::from_vec(headings))?);
        if beliefs.len() == num_locations {
            frames.push(Generation::new(std::mem::take(&mut beliefs))?);
        }
    }

    if !beliefs.is_empty() {
        let (line_no, content) = lines.last().cloned().unwrap_or_default();
        return Err(LocalizationError::malformed(
            source_name,
            line_no,
            format!(
                "last frame has {} of {} location records",
                beliefs.len(),
                num_locations
            ),
            content,
        ));
    }

    Ok(frames)
}

/// Read a decision dump from disk.
pub fn load_decision_dump<P: AsRef<Path>>(path: P) -> Result<Vec<Decision>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_decision_dump(BufReader::new(file), &path.display().to_string())
}

/// Parse a decision dump, reading lines in (location, heading) pairs.
pub fn read_decision_dump<R: BufRead>(reader: R, source_name: &str) -> Result<Vec<Decision>> {
    let lines = read_lines(reader)?;
    let mut decisions = Vec::with_capacity(lines.len() / 2);

    for pair in lines.chunks(2) {
        let (loc_no, loc_line) = &pair[0];
        let Some((head_no, head_line)) = pair.get(1) else {
            return Err(LocalizationError::malformed(
                source_name,
                *loc_no,
                "decision is missing its heading line",
                loc_line.as_str(),
            ));
        };
        decisions.push(Decision {
            location: parse_index(source_name, *loc_no, loc_line)?,
            heading: parse_index(source_name, *head_no, head_line)?,
        });
    }
    Ok(decisions)
}

/// Non-empty lines with their 1-based line numbers. Blank lines only occur
/// as trailing padding in well-formed dumps.
fn read_lines<R: BufRead>(reader: R) -> Result<Vec<(usize, String)>> {
    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push((idx + 1, trimmed.to_string()));
        }
    }
    Ok(lines)
}

fn parse_value(source_name: &str, line_no: usize, text: &str) -> Result<f64> {
    let value: f64 = text.parse().map_err(|_| {
        LocalizationError::malformed(source_name, line_no, "expected a real number", text)
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(LocalizationError::malformed(
            source_name,
            line_no,
            "expected a finite non-negative value",
            text,
        ));
    }
    Ok(value)
}

fn parse_index(source_name: &str, line_no: usize, text: &str) -> Result<usize> {
    text.parse().map_err(|_| {
        LocalizationError::malformed(source_name, line_no, "expected a non-negative integer", text)
    })
}

fn parse_heading_list(source_name: &str, line_no: usize, text: &str) -> Result<Vec<f64>> {
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| {
            LocalizationError::malformed(
                source_name,
                line_no,
                "expected a bracketed heading list",
                text,
            )
        })?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|v| {
            let v = v.trim();
            let value: f64 = v.parse().map_err(|_| {
                LocalizationError::malformed(
                    source_name,
                    line_no,
                    format!("heading value {:?} is not a number", v),
                    text,
                )
            })?;
            if !value.is_finite() || value < 0.0 {
                return Err(LocalizationError::malformed(
                    source_name,
                    line_no,
                    format!("heading value {:?} is negative or not finite", v),
                    text,
                ));
            }
            Ok(value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::{BufWriter, Cursor};
    use tempfile::TempDir;

    fn generation(values: &[(f64, &[f64])]) -> Generation {
        Generation::new(
            values
                .iter()
                .map(|(c, h)| Belief::from_slice(*c, h).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_format_headings() {
        let h = DVector::from_vec(vec![0.25, 1.0, 0.0]);
        assert_eq!(format_headings(&h), "[0.25, 1.0, 0.0]");
    }

    #[test]
    fn test_generation_dump_preserves_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let frames = vec![
            generation(&[(1.0, &[0.1, 0.9]), (12.5, &[1.0 / 3.0, 2.0 / 3.0])]),
            generation(&[(0.3, &[0.0, 0.0]), (7.0, &[0.5, 0.5])]),
        ];
        {
            let mut out = BufWriter::new(File::create(&path).unwrap());
            for g in &frames {
                write_generation(&mut out, g).unwrap();
            }
        }

        let loaded = load_belief_dump(&path, 2, Some(2)).unwrap();
        assert_eq!(loaded, frames);
        assert_relative_eq!(loaded[0].beliefs()[1].headings()[0], 1.0 / 3.0);
    }

    #[test]
    fn test_reads_legacy_layout() {
        let text = "37\n[0.5, 0.5]\n2\n[1.0, 0.0]\n\n\n";
        let frames = read_belief_dump(Cursor::new(text), "rawP.txt", 2, None).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].num_bins(), 2);
        assert_eq!(frames[0].beliefs()[0].confidence(), 37.0);
    }

    #[test]
    fn test_truncated_frame_is_malformed() {
        let text = "1.0\n[0.5, 0.5]\n2.0\n[0.5, 0.5]\n3.0\n[0.5, 0.5]\n";
        let err = read_belief_dump(Cursor::new(text), "out.txt", 2, None).unwrap_err();
        assert!(matches!(err, LocalizationError::MalformedRecord { line: 6, .. }));
    }

    #[test]
    fn test_missing_heading_line_is_malformed() {
        let text = "1.0\n[0.5, 0.5]\n2.0\n";
        let err = read_belief_dump(Cursor::new(text), "out.txt", 1, None).unwrap_err();
        assert!(matches!(err, LocalizationError::MalformedRecord { line: 3, .. }));
    }

    #[test]
    fn test_non_numeric_value_identifies_line() {
        let text = "1.0\n[0.5, abc]\n";
        match read_belief_dump(Cursor::new(text), "out.txt", 1, None).unwrap_err() {
            LocalizationError::MalformedRecord {
                source_name,
                line,
                content,
                ..
            } => {
                assert_eq!(source_name, "out.txt");
                assert_eq!(line, 2);
                assert_eq!(content, "[0.5, abc]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unbracketed_list_is_malformed() {
        let text = "1.0\n0.5, 0.5\n";
        assert!(matches!(
            read_belief_dump(Cursor::new(text), "out.txt", 1, None),
            Err(LocalizationError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_negative_values_rejected() {
        let text = "-1.0\n[0.5, 0.5]\n";
        assert!(read_belief_dump(Cursor::new(text), "out.txt", 1, None).is_err());
        let text = "1.0\n[0.5, -0.5]\n";
        assert!(read_belief_dump(Cursor::new(text), "out.txt", 1, None).is_err());
    }

    #[test]
    fn test_bin_count_mismatch() {
        let text = "1.0\n[0.5, 0.5]\n1.0\n[0.2, 0.3, 0.5]\n";
        let err = read_belief_dump(Cursor::new(text), "out.txt", 1, None).unwrap_err();
        assert!(matches!(
            err,
            LocalizationError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));

        let text = "1.0\n[0.5, 0.5]\n";
        assert!(read_belief_dump(Cursor::new(text), "out.txt", 1, Some(25)).is_err());
    }

    #[test]
    fn test_decision_dump() {
        let mut buf = Vec::new();
        write_decision(&mut buf, &Decision { location: 4, heading: 17 }).unwrap();
        write_decision(&mut buf, &Decision { location: 0, heading: 0 }).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "4\n17\n0\n0\n");

        let decisions = read_decision_dump(Cursor::new(buf), "bestGuess.txt").unwrap();
        assert_eq!(decisions[0], Decision { location: 4, heading: 17 });
        assert_eq!(decisions[1], Decision { location: 0, heading: 0 });
    }

    #[test]
    fn test_decision_dump_odd_line_count() {
        let err = read_decision_dump(Cursor::new("1\n2\n3\n"), "bestGuess.txt").unwrap_err();
        assert!(matches!(err, LocalizationError::MalformedRecord { line: 3, .. }));
        assert!(read_decision_dump(Cursor::new("1\nx\n"), "bestGuess.txt").is_err());
    }
}
