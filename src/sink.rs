//! Where output variables go: stdout always, plus the step output file
//! the orchestrator hands us.

use deploykit::{Error, Output};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Render one output as a `KEY=value` line.
pub fn format_line(output: &Output) -> String {
    format!("{}={}", output.key, output.value)
}

fn render(outputs: &[Output]) -> String {
    outputs
        .iter()
        .map(|output| format_line(output) + "\n")
        .collect()
}

/// Write outputs to the output file (if any), then to `out`.
///
/// The file is written first so a failed write leaves nothing printed.
pub fn publish<W: Write>(
    out: &mut W,
    outputs: &[Output],
    output_file: Option<&Path>,
) -> deploykit::Result<()> {
    if let Some(path) = output_file {
        append_outputs(path, outputs)?;
    }

    out.write_all(render(outputs).as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| Error::runtime(format!("cannot print outputs: {e}")))
}

/// Append outputs to `path`, creating it and its parent directories.
///
/// Earlier steps may have written to the same file, so existing content is
/// kept.
pub fn append_outputs(path: &Path, outputs: &[Output]) -> deploykit::Result<()> {
    let io_error = |e: std::io::Error| {
        Error::configuration(format!("cannot write outputs to {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;

    file.write_all(render(outputs).as_bytes()).map_err(io_error)?;

    log::debug!("Wrote {} outputs to {}", outputs.len(), path.display());
    Ok(())
}
