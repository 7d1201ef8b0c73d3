use std::sync::Arc;
use url::Url;
use weft_core::{err, Driver, Error, Result};

/// Resolves a driver from a connection URL's scheme.
pub fn driver_for(url: &str) -> Result<Arc<dyn Driver>> {
    let parsed = Url::parse(url).map_err(Error::driver)?;

    match parsed.scheme() {
        #[cfg(feature = "memory")]
        "memory" => Ok(Arc::new(weft_driver_memory::Memory::from_url(url)?)),

        #[cfg(not(feature = "memory"))]
        "memory" => Err(err!("`memory` feature not enabled")),

        scheme => Err(err!("unsupported storage; scheme={scheme}; url={url}")),
    }
}
