//! Test helpers for staging input files and an in-memory corridor.

use super::*;
use crate::optimize::{OptimizeConfig, OptimizerBuilder};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::sync::Arc;
use tempfile::TempDir;
use tollgate_core::Optimizer;
use tollgate_core::test_support::CorridorWorld;
use tollgate_solver::ConstraintResolver;

pub(super) fn write_utf8(path: &Utf8Path, contents: &str) {
    tollgate_fs::write_utf8(path, contents).expect("write test file");
}

/// Temporary directory holding placeholder catalog and tariff files.
#[derive(Debug)]
pub(super) struct InputFiles {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
    pub(super) catalog: Utf8PathBuf,
    pub(super) tariffs: Utf8PathBuf,
}

impl InputFiles {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let catalog = root.join("catalog.json");
        let tariffs = root.join("tariffs.json");
        write_utf8(&catalog, r#"{"tolls": [], "junctions": []}"#);
        write_utf8(&tariffs, r#"{"tariffs": []}"#);
        Self {
            _dir: dir,
            root,
            catalog,
            tariffs,
        }
    }
}

/// Builds a resolver over a [`CorridorWorld`] and records the configuration
/// it was asked to build for.
pub(super) struct CorridorBuilder<'a> {
    pub(super) world: Arc<CorridorWorld>,
    pub(super) seen: &'a RefCell<Option<OptimizeConfig>>,
}

impl OptimizerBuilder for CorridorBuilder<'_> {
    fn build(&self, config: &OptimizeConfig) -> Result<Box<dyn Optimizer>, CliError> {
        self.seen.replace(Some(config.clone()));
        let resolver = ConstraintResolver::new(
            Arc::clone(&self.world),
            Arc::clone(&self.world),
            Arc::clone(&self.world),
        );
        Ok(Box::new(resolver))
    }
}
