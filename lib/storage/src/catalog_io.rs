//! Catalog and ratings files
//!
//! Both are accepted as JSON-lines (one record per line) or a single JSON
//! array, optionally gzip-compressed when the file name ends in `.gz`.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sommelier_core::{
    aggregate_ratings, attach_ratings, Catalog, Error, RatingEntry, Result, WineRecord,
};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Read records from a JSON-lines or JSON array file
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let mut text = String::new();
    if is_gzip(path) {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut text)?;
    }

    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text)
            .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)));
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| Error::Serialization(format!("{}:{}: {}", path.display(), i + 1, e)))
        })
        .collect()
}

/// Write records as JSON-lines, gzip-compressed for `.gz` paths
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_lines(&mut encoder, records)?;
        encoder.finish()?.flush()?;
    } else {
        let mut file = file;
        write_lines(&mut file, records)?;
        file.flush()?;
    }
    Ok(())
}

fn write_lines<W: Write, T: Serialize>(writer: &mut W, records: &[T]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record).map_err(|e| Error::Serialization(e.to_string()))?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Load the wine catalog, attaching aggregated ratings when a ratings file is given.
///
/// Without ratings, the rating columns already present in the wine rows are kept.
pub fn load_catalog(wines: &Path, ratings: Option<&Path>) -> Result<Catalog> {
    let mut records: Vec<WineRecord> = read_records(wines)?;

    if let Some(ratings) = ratings {
        let entries: Vec<RatingEntry> = read_records(ratings)?;
        let stats = aggregate_ratings(&entries);
        attach_ratings(&mut records, &stats);
        tracing::info!(
            ratings = entries.len(),
            rated_wines = stats.len(),
            "attached ratings"
        );
    }

    tracing::info!(path = %wines.display(), wines = records.len(), "loaded catalog");
    Catalog::new(records)
}
