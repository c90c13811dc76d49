#![forbid(unsafe_code)]
//! On-demand image resizing behind a redirect.
//!
//! A request carries a transform descriptor (`images/gopher-800x0-jpg.png` or
//! `client/w_500,h_500/blue_marble.jpg`). The service decodes it, fetches the original from
//! object storage, resizes it, stores the result under a derived key and redirects the client
//! there. Anything that goes wrong after decoding redirects to the original instead.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod server;
pub mod storage;
pub mod transform;

pub use config::ServiceConfig;
pub use descriptor::{
    DecodedDescriptor, DescriptorError, HostTemplate, ParamsDescriptor, RasterFormat,
    SuffixDescriptor, TransformParams, Variant,
};
pub use error::{RedirectorError, RedirectorResult};
pub use server::{AppState, router, serve};
pub use storage::{MemoryStore, ObjectStore, S3Store, StorageError};
pub use transform::{ImageTransform, PixelTransform, TransformError, TransformedImage};
