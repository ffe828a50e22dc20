use std::path::Path;

use pak_parser::{method_name, PakReader};
use serde_json::json;

use crate::output::{create_table, format_size};
use crate::OutputFormat;

pub fn handle(archive: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let pak = PakReader::open(archive)?;
    let methods = &pak.trailer().compression_methods;

    match format {
        OutputFormat::Text => {
            let mut table = create_table(&[
                "Path",
                "Offset",
                "Compressed",
                "Uncompressed",
                "Method",
                "Blocks",
            ]);
            for entry in pak.entries() {
                let record = &entry.data.record;
                let method = if record.compression_method == 0 {
                    "none".to_string()
                } else {
                    method_name(record.compression_method, methods)
                };
                table.add_row(vec![
                    entry.path.clone(),
                    format!("{:#x}", record.offset),
                    format_size(record.compressed_size),
                    format_size(record.uncompressed_size),
                    if record.encrypted {
                        format!("{method} (encrypted)")
                    } else {
                        method
                    },
                    record.compression_blocks.len().to_string(),
                ]);
            }
            println!("{table}");
            println!("{} files", pak.entries().len());
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let entries: Vec<_> = pak
                .entries()
                .iter()
                .map(|entry| {
                    let record = &entry.data.record;
                    json!({
                        "path": entry.path,
                        "offset": record.offset,
                        "data_offset": entry.data.data_offset,
                        "compressed_size": record.compressed_size,
                        "uncompressed_size": record.uncompressed_size,
                        "compression_method": method_name(record.compression_method, methods),
                        "compression_blocks": record.compression_blocks.len(),
                        "encrypted": record.encrypted,
                        "hash": record.data_hash_hex(),
                    })
                })
                .collect();
            let value = json!({
                "mount_point": pak.mount_point(),
                "files": entries,
            });
            if matches!(format, OutputFormat::JsonPretty) {
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", serde_json::to_string(&value)?);
            }
        }
    }

    Ok(())
}
