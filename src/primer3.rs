//! `primer3_core` integration over Boulder-IO.
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Result, ScreenError};
use crate::primer::{DesignParams, DesignResponse, PrimerDesigner, DESIGN_TASK, MELTING_RANGE};
use crate::sequence::Sequence;

/// Runs the `primer3_core` binary once per request.
#[derive(Clone, Debug)]
pub struct Primer3 {
    binary_path: PathBuf,
}

impl Primer3 {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self { binary_path: binary_path.into() }
    }

    /// The Boulder-IO record sent on stdin.
    pub fn boulder_request(template: &Sequence, params: &DesignParams) -> String {
        let mut rec = String::new();
        rec.push_str(&format!("SEQUENCE_ID={}\n", template.id));
        rec.push_str(&format!("SEQUENCE_TEMPLATE={}\n", template.as_str()));
        rec.push_str(&format!("PRIMER_TASK={DESIGN_TASK}\n"));
        rec.push_str(&format!("PRIMER_PRODUCT_SIZE_RANGE={}-{}\n", params.product_min, params.product_max));
        rec.push_str(&format!("PRIMER_OPT_TM={}\n", params.optimal_melting_temp));
        rec.push_str(&format!("PRIMER_MIN_TM={}\n", MELTING_RANGE.0));
        rec.push_str(&format!("PRIMER_MAX_TM={}\n", MELTING_RANGE.1));
        rec.push_str("=\n");
        rec
    }
}

impl PrimerDesigner for Primer3 {
    fn design(&self, template: &Sequence, params: &DesignParams) -> Result<DesignResponse> {
        let request = Self::boulder_request(template, params);
        debug!(binary = %self.binary_path.display(), id = %template.id, "running primer3");

        let mut child = Command::new(&self.binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScreenError::DesignService(format!("cannot start {}: {}", self.binary_path.display(), e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.as_bytes())
                .map_err(|e| ScreenError::DesignService(format!("cannot send request to primer3: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ScreenError::DesignService(format!("primer3 did not complete: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScreenError::DesignService(format!(
                "primer3 exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        DesignResponse::parse_boulder(&String::from_utf8_lossy(&output.stdout))
    }
}
