//! Host name lookup for the topic namespace.
//!
//! Only used when the config does not pin `hostname`. The name is returned as
//! the OS reports it; sanitizing happens in [`crate::mqtt::Namespace`].

use std::ffi::OsString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostnameError {
    #[error("failed to read host name: {0}")]
    Lookup(#[from] std::io::Error),

    #[error("host name is empty")]
    Empty,
}

pub fn lookup_hostname() -> Result<String, HostnameError> {
    host_name_from(::hostname::get()?)
}

fn host_name_from(raw: OsString) -> Result<String, HostnameError> {
    let name = raw.to_string_lossy().trim().to_string();
    if name.is_empty() {
        return Err(HostnameError::Empty);
    }
    Ok(name)
}
