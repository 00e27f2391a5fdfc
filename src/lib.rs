pub mod api;
pub mod blosc;
pub mod codecs;
pub mod error;
pub mod filters;
pub mod include;

pub use api::*;
pub use crate::blosc::b2nd::Geometry;
pub use crate::blosc::schunk::{Blosc2Metalayer, Blosc2Schunk};
pub use crate::error::{Error, Result};
pub use crate::filters::{Filter, FilterParams, FilterRegistry, NdMean};
pub use crate::include::b2nd_include::{B2ND_METALAYER_NAME, CATERVA_METALAYER_NAME};
pub use crate::include::blosc2_include::*;
pub use crate::include::filters_registry::BLOSC_FILTER_NDMEAN;
