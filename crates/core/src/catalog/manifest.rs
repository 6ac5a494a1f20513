//! Addon manifest.

use serde::{Deserialize, Serialize};

use super::CATALOG_TYPE;
use crate::codec::ID_PREFIX;

/// Identifier of the single catalog this addon publishes.
pub const CATALOG_ID: &str = "hackstore";

const ADDON_ID: &str = "org.espada.hackstore";
const ADDON_NAME: &str = "Hackstore Espada";
const CATALOG_NAME: &str = "Hackstore Latinos";

/// Addon manifest served at `/manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub resources: Vec<String>,
    pub types: Vec<String>,
    pub catalogs: Vec<CatalogDescriptor>,
    pub id_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub name: String,
    pub extra: Vec<ExtraProperty>,
}

/// Optional catalog parameter a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraProperty {
    pub name: String,
}

/// The manifest for this build.
pub fn build_manifest() -> Manifest {
    Manifest {
        id: ADDON_ID.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: ADDON_NAME.to_string(),
        description: "Latin-dubbed movies from Hackstore, streamed from BitTorrent".to_string(),
        resources: vec!["catalog".to_string(), "stream".to_string()],
        types: vec![CATALOG_TYPE.to_string()],
        catalogs: vec![CatalogDescriptor {
            kind: CATALOG_TYPE.to_string(),
            id: CATALOG_ID.to_string(),
            name: CATALOG_NAME.to_string(),
            extra: vec![ExtraProperty {
                name: "search".to_string(),
            }],
        }],
        id_prefixes: vec![ID_PREFIX.to_string()],
    }
}
