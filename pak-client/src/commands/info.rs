use std::path::Path;

use pak_parser::{hash_to_hex, Index, PakReader};
use serde_json::json;

use crate::OutputFormat;

pub fn handle(archive: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let pak = PakReader::open(archive)?;
    let trailer = pak.trailer();

    match format {
        OutputFormat::Text => {
            println!("Archive:      {}", archive.display());
            println!("Version:      {}", pak.version());
            println!("Size:         {} bytes", pak.length());
            println!("Mount point:  {}", pak.mount_point());
            println!("Files:        {}", pak.entries().len());
            println!("Index offset: {:#x}", trailer.index_offset);
            println!("Index size:   {} bytes", trailer.index_size);
            println!("Index hash:   {}", hash_to_hex(&trailer.index_hash));
            if let Some(guid) = &trailer.encryption_guid {
                println!("Key GUID:     {}", hex::encode_upper(guid));
            }
            if !trailer.compression_methods.is_empty() {
                let named: Vec<&str> = trailer
                    .compression_methods
                    .iter()
                    .filter(|name| !name.is_empty())
                    .map(String::as_str)
                    .collect();
                println!("Methods:      {}", named.join(", "));
            }
            if let Index::Modern(index) = pak.index() {
                println!("Path hash seed:       {:#x}", index.path_hash_seed);
                println!(
                    "Path hash index:      {}",
                    index.path_hash_index.is_some()
                );
                println!(
                    "Full directory index: {}",
                    index.full_directory_index.is_some()
                );
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let modern = match pak.index() {
                Index::Modern(index) => Some(json!({
                    "path_hash_seed": index.path_hash_seed,
                    "has_path_hash_index": index.path_hash_index.is_some(),
                    "has_full_directory_index": index.full_directory_index.is_some(),
                })),
                Index::Legacy(_) => None,
            };
            let value = json!({
                "archive": archive.display().to_string(),
                "version": pak.version(),
                "size": pak.length(),
                "mount_point": pak.mount_point(),
                "file_count": pak.entries().len(),
                "index_offset": trailer.index_offset,
                "index_size": trailer.index_size,
                "index_hash": hash_to_hex(&trailer.index_hash),
                "compression_methods": trailer.compression_methods,
                "modern": modern,
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
