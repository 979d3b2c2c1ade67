//! Model artifact persistence
//!
//! An artifact is a gzip stream of two bincode records: a small header
//! (format version, creation time, schema and catalog fingerprints)
//! followed by the trained model. Files are replaced atomically, so a reader never sees a
//! half-written artifact.

use anyhow::{anyhow, Context};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sommelier_core::{Catalog, Error, IndexState, NeighborSearch, Result};
use sommelier_encoder::EncoderState;
use sommelier_recommend::TrainedModel;
use std::fs;
use std::io::{BufReader, Write};
use std::path::Path;

/// Current artifact layout version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// File name of the model artifact inside a data directory
pub const MODEL_FILENAME: &str = "model.bin.gz";

/// Leading record of every artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    /// Fingerprint of the encoder schema the index was built with
    pub fingerprint: String,
    /// Fingerprint of the catalog the index rows belong to, when known
    pub catalog_fingerprint: Option<String>,
}

/// A loaded artifact
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub header: ArtifactHeader,
    pub model: TrainedModel,
}

/// Artifact description for the `inspect` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescription {
    pub path: String,
    pub size: u64,
    pub created_at: String,
    pub format_version: u32,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_fingerprint: Option<String>,
    /// SHA-256 of the artifact file
    pub checksum: String,
    pub columns: usize,
    pub rows: usize,
}

fn persistence_error(e: anyhow::Error) -> Error {
    Error::Persistence(format!("{:#}", e))
}

/// Save an encoder and the index built from it as one artifact
pub fn save(encoder: &EncoderState, index: &IndexState, path: &Path) -> Result<ArtifactHeader> {
    let model = TrainedModel::new(encoder.clone(), index.clone())?;
    save_model(&model, path)
}

/// SHA-256 over every catalog record in row order.
///
/// Reordering, adding, removing or editing a wine changes it.
pub fn catalog_fingerprint(catalog: &Catalog) -> Result<String> {
    let mut hasher = Sha256::new();
    for wine in catalog.iter() {
        let record = serde_json::to_vec(wine).map_err(|e| Error::Serialization(e.to_string()))?;
        hasher.update(&record);
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Save a trained model as one artifact
pub fn save_model(model: &TrainedModel, path: &Path) -> Result<ArtifactHeader> {
    save_with_catalog(model, None, path)
}

/// Save a model fitted over `catalog`, recording the catalog fingerprint
pub fn save_catalog_model(model: &TrainedModel, catalog: &Catalog, path: &Path) -> Result<ArtifactHeader> {
    save_with_catalog(model, Some(catalog_fingerprint(catalog)?), path)
}

fn save_with_catalog(
    model: &TrainedModel,
    catalog_fingerprint: Option<String>,
    path: &Path,
) -> Result<ArtifactHeader> {
    let header = ArtifactHeader {
        format_version: ARTIFACT_FORMAT_VERSION,
        created_at: Utc::now(),
        fingerprint: model.encoder().fingerprint().to_string(),
        catalog_fingerprint,
    };
    write_artifact(path, &header, model).map_err(persistence_error)?;

    tracing::info!(
        path = %path.display(),
        rows = model.rows(),
        fingerprint = %header.fingerprint,
        "saved model artifact"
    );
    Ok(header)
}

pub(crate) fn write_artifact(
    path: &Path,
    header: &ArtifactHeader,
    model: &TrainedModel,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    bincode::serialize_into(&mut encoder, header)
        .map_err(|e| anyhow!("Serialization error: {}", e))?;
    bincode::serialize_into(&mut encoder, model)
        .map_err(|e| anyhow!("Serialization error: {}", e))?;
    let data = encoder.finish()?;

    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(&data))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Load the encoder and index from an artifact
pub fn load(path: &Path) -> Result<(EncoderState, IndexState)> {
    Ok(load_model(path)?.into_parts())
}

/// Load a trained model from an artifact
pub fn load_model(path: &Path) -> Result<TrainedModel> {
    Ok(load_artifact(path)?.model)
}

/// Load and validate an artifact.
///
/// Fails with [`Error::Persistence`] when the file is missing or unreadable,
/// has an unknown format version, or its encoder and index disagree.
pub fn load_artifact(path: &Path) -> Result<ModelArtifact> {
    let artifact = read_artifact(path).map_err(persistence_error)?;
    artifact
        .model
        .validate()
        .map_err(|e| Error::Persistence(format!("inconsistent artifact {}: {}", path.display(), e)))?;

    let actual = artifact.model.encoder().fingerprint();
    if artifact.header.fingerprint != actual {
        return Err(Error::Persistence(format!(
            "fingerprint mismatch in {}: header {}, encoder {}",
            path.display(),
            artifact.header.fingerprint,
            actual
        )));
    }

    tracing::info!(
        path = %path.display(),
        rows = artifact.model.rows(),
        created_at = %artifact.header.created_at,
        "loaded model artifact"
    );
    Ok(artifact)
}

fn read_artifact(path: &Path) -> anyhow::Result<ModelArtifact> {
    if !path.exists() {
        return Err(anyhow!("model artifact not found at {}", path.display()));
    }

    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));

    let header: ArtifactHeader = bincode::deserialize_from(&mut decoder)
        .map_err(|e| anyhow!("Deserialization error: {}", e))?;
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(anyhow!(
            "unsupported artifact format version {} (expected {})",
            header.format_version,
            ARTIFACT_FORMAT_VERSION
        ));
    }

    let model: TrainedModel = bincode::deserialize_from(&mut decoder)
        .map_err(|e| anyhow!("Deserialization error: {}", e))?;

    Ok(ModelArtifact { header, model })
}

/// Describe an artifact without keeping it loaded
pub fn describe(path: &Path) -> Result<ArtifactDescription> {
    let artifact = load_artifact(path)?;

    let data = fs::read(path).map_err(|e| Error::Persistence(e.to_string()))?;
    let checksum = format!("{:x}", Sha256::digest(&data));

    Ok(ArtifactDescription {
        path: path.display().to_string(),
        size: data.len() as u64,
        created_at: artifact.header.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        format_version: artifact.header.format_version,
        fingerprint: artifact.header.fingerprint,
        catalog_fingerprint: artifact.header.catalog_fingerprint,
        checksum,
        columns: artifact.model.encoder().width(),
        rows: artifact.model.index().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sommelier_core::{Catalog, WineProfile, WineRecord};
    use sommelier_encoder::EncoderConfig;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            WineRecord::new(1u64, "a", "Portugal", "Red")
                .with_grapes(["Touriga Nacional"])
                .with_abv(13.0),
            WineRecord::new(2u64, "b", "Portugal", "White")
                .with_grapes(["Alvarinho"])
                .with_acidity("High"),
            WineRecord::new(3u64, "c", "Spain", "Rosé").with_coordinates(41.6, -0.9),
        ])
        .unwrap()
    }

    fn model() -> TrainedModel {
        TrainedModel::fit(&catalog(), &EncoderConfig::default()).unwrap()
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(MODEL_FILENAME);
        let model = model();

        let header = save(model.encoder(), model.index(), &path).unwrap();
        assert_eq!(header.fingerprint, model.encoder().fingerprint());

        let (encoder, index) = load(&path).unwrap();
        assert_eq!(&encoder, model.encoder());
        assert_eq!(&index, model.index());

        let query = WineProfile::new().with_type("Red").with_abv(15.5);
        assert_eq!(
            encoder.transform_one(&query).unwrap(),
            model.encoder().transform_one(&query).unwrap()
        );
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = load(&temp_dir.path().join("nope.bin.gz"));
        assert!(matches!(result, Err(Error::Persistence(_))));
    }

    #[test]
    fn test_garbage_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(MODEL_FILENAME);
        fs::write(&path, b"definitely not a model").unwrap();
        assert!(matches!(load(&path), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_fingerprint_mismatch_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(MODEL_FILENAME);
        let header = ArtifactHeader {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            fingerprint: "0".repeat(64),
            catalog_fingerprint: None,
        };
        write_artifact(&path, &header, &model()).unwrap();

        match load(&path) {
            Err(Error::Persistence(msg)) => assert!(msg.contains("fingerprint")),
            other => panic!("expected persistence error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unknown_version_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(MODEL_FILENAME);
        let model = model();
        let header = ArtifactHeader {
            format_version: ARTIFACT_FORMAT_VERSION + 1,
            created_at: Utc::now(),
            fingerprint: model.encoder().fingerprint().to_string(),
            catalog_fingerprint: None,
        };
        write_artifact(&path, &header, &model).unwrap();
        assert!(matches!(load(&path), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_describe() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(MODEL_FILENAME);
        let model = model();
        save_model(&model, &path).unwrap();

        let description = describe(&path).unwrap();
        assert_eq!(description.rows, 3);
        assert_eq!(description.columns, model.encoder().width());
        assert_eq!(description.size, fs::metadata(&path).unwrap().len());
        assert_eq!(description.checksum.len(), 64);
        assert_eq!(description.fingerprint, model.encoder().fingerprint());
        assert!(description.catalog_fingerprint.is_none());
    }

    #[test]
    fn test_catalog_fingerprint_tracks_rows() {
        let catalog = catalog();
        let fingerprint = catalog_fingerprint(&catalog).unwrap();
        assert_eq!(fingerprint, catalog_fingerprint(&catalog.clone()).unwrap());
        assert_eq!(fingerprint.len(), 64);

        let mut records: Vec<WineRecord> = catalog.iter().cloned().collect();
        records.reverse();
        let reversed = Catalog::new(records.clone()).unwrap();
        assert_ne!(fingerprint, catalog_fingerprint(&reversed).unwrap());

        records[0] = records[0].clone().with_abv(9.0);
        let edited = Catalog::new(records).unwrap();
        assert_ne!(catalog_fingerprint(&reversed).unwrap(), catalog_fingerprint(&edited).unwrap());
    }

    #[test]
    fn test_catalog_fingerprint_saved() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(MODEL_FILENAME);
        let catalog = catalog();
        let model = TrainedModel::fit(&catalog, &EncoderConfig::default()).unwrap();

        let header = save_catalog_model(&model, &catalog, &path).unwrap();
        let expected = catalog_fingerprint(&catalog).unwrap();
        assert_eq!(header.catalog_fingerprint.as_deref(), Some(expected.as_str()));
        assert_eq!(load_artifact(&path).unwrap().header, header);
        assert_eq!(describe(&path).unwrap().catalog_fingerprint, Some(expected));
    }
}
