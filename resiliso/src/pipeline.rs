//! # Resiliso Pipeline Module
//!
//! One configurable build flow replacing the per-variant build scripts:
//!
//! ```text
//! payload ─► split ─► chain + parity ─► redundancy set on disk
//!                                   └─► (include_redundancy) embed as files
//!         ─► assemble image ─► free-space check ─► write image ─► (optional) finisher
//! ```
//!
//! The payload is the boot image: it is both loaded by the boot catalog and protected
//! by the redundancy set. Post-processing of the finished image (signing, hybrid
//! conversion, authoring tools) is an injected `ImageFinisher`; nothing else in the
//! crate depends on it.
//!
//! Copyrights © 2025 Resiliso Contributors. All rights reserved.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{ResilisoConfig, ensure_space};
use crate::disc_image::{EmbeddedFile, assemble};
use crate::redundancy_set::{EncodedSet, RedundancySet};
use crate::utils::write_file;

use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    Finished,
    Failed(String),
}

/// External step run on the written image. A single synchronous call.
pub trait ImageFinisher {
    fn finish(&self, image: &Path) -> Result<FinishOutcome>;
}

/// Runs `program args... <image>` and maps the exit status to a `FinishOutcome`.
#[derive(Debug, Clone)]
pub struct CommandFinisher {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandFinisher {
    pub fn new<S: Into<OsString>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl ImageFinisher for CommandFinisher {
    fn finish(&self, image: &Path) -> Result<FinishOutcome> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .status()
            .with_context(|| format!("running {:?}", self.program))?;

        if status.success() {
            Ok(FinishOutcome::Finished)
        } else {
            Ok(FinishOutcome::Failed(format!("{:?} exited with {status}", self.program)))
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub image_path: PathBuf,
    pub image_len: u64,
    pub redundancy: RedundancySet,
    pub embedded_files: usize,
    pub finish: Option<FinishOutcome>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub config: ResilisoConfig,
}

impl Pipeline {
    pub fn new(config: ResilisoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, payload: &[u8], finisher: Option<&dyn ImageFinisher>) -> Result<BuildReport> {
        let config = &self.config;
        let encoded = EncodedSet::encode(payload, config.block_size)?;

        let files = if config.include_redundancy {
            encoded
                .artifacts()
                .into_iter()
                .map(|(name, data)| EmbeddedFile::new(&name, data))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let image = assemble(&config.volume_id, &config.boot_catalog_id, payload, &files)?;

        let needed = (image.len() + encoded.artifact_bytes()) as u64;
        let target_dir = match config.image_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_space(&target_dir, needed)?;

        let redundancy = RedundancySet::write_encoded(&config.redundancy_dir, &encoded)?;
        write_file(&config.image_path, &image)?;
        info!(
            image = %config.image_path.display(),
            bytes = image.len(),
            embedded = files.len(),
            "wrote disc image"
        );

        let finish = match finisher {
            Some(finisher) => {
                let outcome = finisher.finish(&config.image_path)?;
                if let FinishOutcome::Failed(reason) = &outcome {
                    warn!(%reason, "image finisher failed; the unfinished image is kept");
                }
                Some(outcome)
            }
            None => None,
        };

        Ok(BuildReport {
            image_path: config.image_path.clone(),
            image_len: image.len() as u64,
            redundancy,
            embedded_files: files.len(),
            finish,
        })
    }
}
