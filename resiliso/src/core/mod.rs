//! On-disk building blocks: the redundancy primitives (blocks, chain, parity,
//! manifest) and the ISO 9660 / El Torito records.

pub mod block_splitter;
pub mod boot_catalog;
pub mod directory_record;
pub mod hash_chain;
pub mod manifest;
pub mod parity_block;
pub mod volume_descriptor;
