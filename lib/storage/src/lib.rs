pub mod catalog_io;
pub mod manager;
pub mod persistence;

pub use catalog_io::{load_catalog, read_records, write_records};
pub use manager::ModelStore;
pub use persistence::{
    catalog_fingerprint, describe, load, load_artifact, load_model, save, save_catalog_model,
    save_model, ArtifactDescription,
    ArtifactHeader, ModelArtifact, ARTIFACT_FORMAT_VERSION, MODEL_FILENAME,
};
