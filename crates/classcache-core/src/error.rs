use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::StoreError;

/// Errors from engine setup and endpoint management.
///
/// Table reads and writes never return these; they degrade instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

pub type Result<T> = std::result::Result<T, Error>;
