#![allow(unused_imports)]

pub use crate::config::*;
pub use crate::constants::*;
pub use crate::core::block_splitter::*;
pub use crate::core::boot_catalog::*;
pub use crate::core::directory_record::*;
pub use crate::core::hash_chain::*;
pub use crate::core::manifest::*;
pub use crate::core::parity_block::*;
pub use crate::core::volume_descriptor::*;
pub use crate::disc_image::*;
pub use crate::pipeline::*;
pub use crate::redundancy_set::*;
pub use crate::resiliso_errors::*;
pub use crate::utils::*;
