use std::path::Path;

use pak_parser::{CancelFlag, PakReader};
use serde_json::json;
use tracing::info;

use crate::{ClientError, OutputFormat};

pub fn handle(
    archive: &Path,
    output: &Path,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut pak = PakReader::open(archive)?;
    let total = pak.entries().len();
    info!(
        "extracting {total} files from {} to {}",
        archive.display(),
        output.display()
    );

    let summary = pak.extract_all(output, &CancelFlag::new())?;

    match format {
        OutputFormat::Text => {
            for failure in &summary.failures {
                eprintln!("failed: {}: {}", failure.path, failure.error);
            }
            println!(
                "Extracted {} of {total} files to {}",
                summary.extracted,
                output.display()
            );
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let failures: Vec<_> = summary
                .failures
                .iter()
                .map(|failure| {
                    json!({
                        "path": failure.path,
                        "error": failure.error.to_string(),
                    })
                })
                .collect();
            let value = json!({
                "extracted": summary.extracted,
                "total": total,
                "failures": failures,
            });
            if matches!(format, OutputFormat::JsonPretty) {
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", serde_json::to_string(&value)?);
            }
        }
    }

    if !summary.failures.is_empty() {
        return Err(ClientError::PartialExtraction {
            failed: summary.failures.len(),
            total,
        }
        .into());
    }
    Ok(())
}
