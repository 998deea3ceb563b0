//! Firmware update server access.

use std::io::Read;

use tracing::debug;

use crate::config::UpdateConfig;
use crate::error::UpdateServerError;

/// Source of firmware update metadata and binaries.
pub trait UpdateServer {
    /// Fetch the metadata file: the version on the first line, the
    /// checksum on the second.
    fn fetch_info(&self) -> Result<String, UpdateServerError>;

    /// Fetch the firmware binary, refusing anything over `max_size` bytes.
    fn fetch_binary(&self, max_size: usize) -> Result<Vec<u8>, UpdateServerError>;
}

impl<T: UpdateServer + ?Sized> UpdateServer for &T {
    fn fetch_info(&self) -> Result<String, UpdateServerError> {
        (**self).fetch_info()
    }

    fn fetch_binary(&self, max_size: usize) -> Result<Vec<u8>, UpdateServerError> {
        (**self).fetch_binary(max_size)
    }
}

/// Update server reached over HTTPS.
pub struct HttpUpdateServer {
    client: reqwest::blocking::Client,
    info_url: String,
    binary_url: String,
}

impl std::fmt::Debug for HttpUpdateServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpdateServer")
            .field("info_url", &self.info_url)
            .field("binary_url", &self.binary_url)
            .finish()
    }
}

impl HttpUpdateServer {
    /// Create a server client for the URLs in `config`.
    pub fn new(config: &UpdateConfig) -> Result<Self, UpdateServerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("ecb/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpUpdateServer {
            client,
            info_url: config.info_url(),
            binary_url: config.binary_url(),
        })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, UpdateServerError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(UpdateServerError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

impl UpdateServer for HttpUpdateServer {
    fn fetch_info(&self) -> Result<String, UpdateServerError> {
        Ok(self.get(&self.info_url)?.text()?)
    }

    fn fetch_binary(&self, max_size: usize) -> Result<Vec<u8>, UpdateServerError> {
        let response = self.get(&self.binary_url)?;
        if let Some(len) = response.content_length() {
            if len as usize > max_size {
                return Err(UpdateServerError::TooLarge {
                    max: max_size,
                    actual: len as usize,
                });
            }
        }

        let data = read_limited(response, max_size)?;
        debug!("downloaded {} byte firmware", data.len());
        Ok(data)
    }
}

/// Read a body of at most `max_size` bytes, whatever the headers claimed.
///
/// Stops one byte past the limit, so an endless body cannot exhaust memory.
fn read_limited<R: Read>(reader: R, max_size: usize) -> Result<Vec<u8>, UpdateServerError> {
    let mut data = Vec::new();
    reader.take(max_size as u64 + 1).read_to_end(&mut data)?;
    if data.len() > max_size {
        return Err(UpdateServerError::TooLarge {
            max: max_size,
            actual: data.len(),
        });
    }
    Ok(data)
}
