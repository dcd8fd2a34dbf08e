//! Command log: one movement command per frame.
//!
//! Each line starts with the frame key (zero-padded frame number, 4
//! characters by default) and ends with the command code: `l`, `r`, `f`, or
//! anything else for no movement.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::belief::Command;
use crate::error::{LocalizationError, Result};

/// Width of the frame key at the start of each line.
pub const DEFAULT_KEY_WIDTH: usize = 4;

/// Commands indexed by frame key.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: HashMap<String, Command>,
}

impl CommandLog {
    /// Read a command log from disk.
    pub fn load<P: AsRef<Path>>(path: P, key_width: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::parse(BufReader::new(file), &path.display().to_string(), key_width)
    }

    /// Parse command records. Blank lines are skipped; a later record for the
    /// same key replaces an earlier one.
    pub fn parse<R: BufRead>(reader: R, source_name: &str, key_width: usize) -> Result<Self> {
        let mut commands = HashMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let chars: Vec<char> = line.chars().collect();
            if chars.len() <= key_width {
                return Err(LocalizationError::malformed(
                    source_name,
                    idx + 1,
                    format!("expected a {}-character frame key followed by a command code", key_width),
                    line,
                ));
            }

            let key: String = chars[..key_width].iter().collect();
            let code = chars[chars.len() - 1];
            let command = Command::from_code(code);
            if command == Command::Stay && code != 's' {
                debug!("Frame {}: command code {:?} treated as no movement", key, code);
            }

            if commands.insert(key.clone(), command).is_some() {
                warn!("Frame {} has more than one command, keeping the last", key);
            }
        }

        Ok(Self { commands })
    }

    /// Command recorded for a frame.
    pub fn command_for(&self, key: &str) -> Result<Command> {
        self.commands
            .get(key)
            .copied()
            .ok_or_else(|| LocalizationError::MissingCommand {
                key: key.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl FromIterator<(String, Command)> for CommandLog {
    fn from_iter<I: IntoIterator<Item = (String, Command)>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<CommandLog> {
        CommandLog::parse(Cursor::new(text), "commands.txt", DEFAULT_KEY_WIDTH)
    }

    #[test]
    fn test_parse_commands() {
        let log = parse("0000 l\n0001 r\n0002 f\n0003 x\n\n0004s\n").unwrap();
        assert_eq!(log.len(), 5);
        assert_eq!(log.command_for("0000").unwrap(), Command::Left);
        assert_eq!(log.command_for("0001").unwrap(), Command::Right);
        assert_eq!(log.command_for("0002").unwrap(), Command::Forward);
        assert_eq!(log.command_for("0003").unwrap(), Command::Stay);
        assert_eq!(log.command_for("0004").unwrap(), Command::Stay);
    }

    #[test]
    fn test_crlf_line_endings() {
        let log = parse("0000,f\r\n0001,l\r\n").unwrap();
        assert_eq!(log.command_for("0000").unwrap(), Command::Forward);
        assert_eq!(log.command_for("0001").unwrap(), Command::Left);
    }

    #[test]
    fn test_missing_command_is_an_error() {
        let log = parse("0000 l\n").unwrap();
        let err = log.command_for("0001").unwrap_err();
        assert!(matches!(err, LocalizationError::MissingCommand { key } if key == "0001"));
    }

    #[test]
    fn test_short_line_is_malformed() {
        let err = parse("0000 l\n001\n").unwrap_err();
        match err {
            LocalizationError::MalformedRecord { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "001");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_key_keeps_last() {
        let log = parse("0000 l\n0000 r\n").unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.command_for("0000").unwrap(), Command::Right);
    }
}
