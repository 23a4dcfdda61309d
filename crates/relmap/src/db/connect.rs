use crate::{
    driver::{Capability, Driver},
    Connection, Error, Result,
};

use relmap_core::async_trait;
use std::borrow::Cow;
use url::Url;

/// Picks the driver for a connection URL by its scheme.
#[derive(Debug)]
pub struct Connect {
    url: Url,
}

impl Connect {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|err| Error::invalid_connection_url(format!("{err}; url={url}")))?;

        match url.scheme() {
            "sqlite" | "postgresql" | "mysql" => Ok(Self { url }),
            scheme => Err(Error::invalid_connection_url(format!(
                "unsupported database; scheme={scheme}; url={url}"
            ))),
        }
    }
}

#[async_trait]
impl Driver for Connect {
    fn url(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.url.as_str())
    }

    fn capability(&self) -> &'static Capability {
        match self.url.scheme() {
            "mysql" => &Capability::MYSQL,
            "postgresql" => &Capability::POSTGRESQL,
            _ => &Capability::SQLITE,
        }
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        match self.url.scheme() {
            "sqlite" => connect_sqlite(&self.url).await,
            scheme => Err(Error::invalid_connection_url(format!(
                "no driver available for `{scheme}`; url={}",
                self.url
            ))),
        }
    }
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(url: &Url) -> Result<Box<dyn Connection>> {
    relmap_driver_sqlite::Sqlite::new(url.as_str())?.connect().await
}

#[cfg(not(feature = "sqlite"))]
async fn connect_sqlite(_url: &Url) -> Result<Box<dyn Connection>> {
    Err(Error::invalid_connection_url("`sqlite` feature not enabled"))
}
