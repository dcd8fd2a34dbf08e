//! Ground-truth labels: headerless CSV of `frame_key,location,heading`.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::belief::Decision;
use crate::error::{LocalizationError, Result};

/// Known (location, heading) for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundTruthEntry {
    pub key: String,
    pub location: usize,
    pub heading: usize,
}

impl GroundTruthEntry {
    pub fn decision(&self) -> Decision {
        Decision {
            location: self.location,
            heading: self.heading,
        }
    }
}

/// Ground-truth labels indexed by frame key.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    entries: HashMap<String, GroundTruthEntry>,
}

impl GroundTruth {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        Self::parse(file, &path.display().to_string())
    }

    /// Parse labels. Lines starting with `#` are comments.
    pub fn parse<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for (idx, rec) in rdr.records().enumerate() {
            let line_hint = idx + 1;
            let rec = rec.map_err(|e| {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(line_hint);
                LocalizationError::malformed(source_name, line, e.to_string(), "")
            })?;
            let line = rec
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(line_hint);
            let content = rec.iter().collect::<Vec<_>>().join(",");

            if rec.len() != 3 {
                return Err(LocalizationError::malformed(
                    source_name,
                    line,
                    "expected frame_key,location,heading",
                    content,
                ));
            }
            let parse = |field: &str| -> Result<usize> {
                field.parse().map_err(|_| {
                    LocalizationError::malformed(
                        source_name,
                        line,
                        format!("{:?} is not a non-negative integer", field),
                        content.as_str(),
                    )
                })
            };

            let entry = GroundTruthEntry {
                key: rec[0].to_string(),
                location: parse(&rec[1])?,
                heading: parse(&rec[2])?,
            };
            entries.insert(entry.key.clone(), entry);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&GroundTruthEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<GroundTruthEntry> for GroundTruth {
    fn from_iter<I: IntoIterator<Item = GroundTruthEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|e| (e.key.clone(), e)).collect(),
        }
    }
}
