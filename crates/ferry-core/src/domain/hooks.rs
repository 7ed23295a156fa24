//! Hook descriptors carried in an envelope's composition metadata.
//!
//! Hooks are data only. The dispatcher reads them and performs the side
//! effects around a command run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How an output file is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Truncate,
    Append,
}

/// A file that receives the command's captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub path: PathBuf,
    pub mode: WriteMode,
}

/// Side effects attached to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_after: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_files: Vec<OutputFile>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_output_to: Vec<String>,
}

impl Hooks {
    pub fn is_empty(&self) -> bool {
        self.ping_before.is_none()
            && self.ping_after.is_none()
            && self.output_files.is_empty()
            && self.email_output_to.is_empty()
    }

    /// Does anything consume the command output after the run?
    pub fn delivers_output(&self) -> bool {
        !self.output_files.is_empty() || !self.email_output_to.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hooks_serialize_to_empty_object() {
        let s = serde_json::to_string(&Hooks::default()).unwrap();
        assert_eq!(s, "{}");
        assert!(Hooks::default().is_empty());
    }

    #[test]
    fn output_file_mode_is_snake_case() {
        let hooks = Hooks {
            output_files: vec![OutputFile {
                path: PathBuf::from("out.txt"),
                mode: WriteMode::Append,
            }],
            ..Hooks::default()
        };
        let v = serde_json::to_value(&hooks).unwrap();
        assert_eq!(v["output_files"][0]["mode"], "append");
        assert!(hooks.delivers_output());
        assert!(!hooks.is_empty());
    }
}
