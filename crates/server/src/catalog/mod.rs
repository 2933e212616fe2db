//! Resource catalog: records, ratings, read-side queries and uploads.

use crate::config::FilesConfig;
use crate::storage::SharedStorage;

pub mod ledger;
pub mod registry;
pub mod store;
pub mod upload;

use ledger::RatingLedger;
use registry::RegistryQuery;
use store::ResourceStore;
use upload::UploadPipeline;

/// All catalog components wired to the same storage.
#[derive(Clone)]
pub struct Catalog {
    pub resources: ResourceStore,
    pub ratings: RatingLedger,
    pub registry: RegistryQuery,
    pub uploads: UploadPipeline,
}

impl Catalog {
    pub fn new(storage: SharedStorage, files: &FilesConfig) -> Self {
        let resources = ResourceStore::new(
            storage.clone(),
            files.readme_dir.clone(),
            files.manifest_dir.clone(),
        );
        Self {
            ratings: RatingLedger::new(storage.clone()),
            registry: RegistryQuery::new(storage),
            uploads: UploadPipeline::new(resources.clone()),
            resources,
        }
    }
}
