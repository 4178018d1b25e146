//! Internal diagnostics. Never returned from a public method: consumed
//! immediately by a `log::error!` call and discarded.

use thiserror::Error;

use crate::types::Stage;

/// A shader stage failed to compile, or a program failed to link.
///
/// This type exists only to carry the driver's info-log text to the
/// logging call site in [`crate::ShaderProgram::compile`]; it never crosses
/// a public function boundary.
#[derive(Debug, Error)]
pub enum GlslStageError {
    #[error("{stage:?} shader compilation failed: {log}")]
    Compile { stage: Stage, log: String },

    #[error("program link failed: {log}")]
    Link { log: String },
}
