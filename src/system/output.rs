//! Streaming writers for the per-frame dumps.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::belief::Generation;
use crate::filter::FrameResult;
use crate::io::{write_decision, write_generation};

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    Ok(BufWriter::new(file))
}

/// Writes the belief dump and the decision dump frame by frame.
pub struct DumpWriter {
    beliefs: BufWriter<File>,
    decisions: BufWriter<File>,
}

impl DumpWriter {
    pub fn create(belief_path: &Path, decision_path: &Path) -> Result<Self> {
        Ok(Self {
            beliefs: create(belief_path)?,
            decisions: create(decision_path)?,
        })
    }

    pub fn write(&mut self, frame: &FrameResult) -> Result<()> {
        write_generation(&mut self.beliefs, &frame.generation)
            .with_context(|| format!("Failed to write beliefs of frame {}", frame.key))?;
        write_decision(&mut self.decisions, &frame.decision)
            .with_context(|| format!("Failed to write decision of frame {}", frame.key))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.beliefs.flush()?;
        self.decisions.flush()?;
        Ok(())
    }
}

/// Writes the raw evidence dump: one generation of match counts per frame.
pub struct EvidenceWriter {
    out: BufWriter<File>,
}

impl EvidenceWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self { out: create(path)? })
    }

    pub fn write(&mut self, key: &str, evidence: &Generation) -> Result<()> {
        write_generation(&mut self.out, evidence)
            .with_context(|| format!("Failed to write evidence of frame {}", key))
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
