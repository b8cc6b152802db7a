use std::path::{Path, PathBuf};

use nalgebra::Point3;
use serde::Deserialize;
use thiserror::Error;

use crate::image_io::infrastructure::image_file_reader::frame_from_image;
use crate::overlay::domain::overlay_asset::{AccessoryKind, OverlayAsset};

#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("failed to read asset manifest {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid asset manifest {path}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to decode overlay image {path}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// On-disk asset description. Relative paths resolve against the manifest's
/// directory.
#[derive(Debug, Deserialize)]
struct Manifest {
    id: String,
    kind: AccessoryKind,
    #[serde(default)]
    model_path: Option<PathBuf>,
    #[serde(default)]
    colors: Vec<String>,
    #[serde(default)]
    anchors: Vec<[f64; 3]>,
    image: PathBuf,
}

pub struct OverlayAssetLoader;

impl OverlayAssetLoader {
    pub fn load(manifest_path: &Path) -> Result<OverlayAsset, AssetLoadError> {
        let text = std::fs::read_to_string(manifest_path).map_err(|source| AssetLoadError::Read {
            path: manifest_path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|source| AssetLoadError::Parse {
                path: manifest_path.to_path_buf(),
                source,
            })?;

        let base = manifest_path.parent().unwrap_or(Path::new("."));
        let image_path = base.join(&manifest.image);
        let image = image::open(&image_path).map_err(|source| AssetLoadError::Image {
            path: image_path.clone(),
            source,
        })?;

        log::info!(
            "Loaded {} asset '{}' ({} anchors)",
            manifest.kind,
            manifest.id,
            manifest.anchors.len()
        );

        Ok(OverlayAsset {
            id: manifest.id,
            kind: manifest.kind,
            model_path: manifest.model_path.map(|p| base.join(p)),
            color_variants: manifest.colors,
            anchors: manifest
                .anchors
                .into_iter()
                .map(|[x, y, z]| Point3::new(x, y, z))
                .collect(),
            image: frame_from_image(image),
        })
    }
}
