/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::future::Future;

use super::Error;

/// Retrieves a resource over HTTPS and returns its body as text.
///
/// Used to download signing certificates and to visit subscription
/// confirmation URLs. Implementations are never handed a URL that failed
/// the trusted domain check.
pub trait CertificateFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, Error>> + Send;
}

#[cfg(feature = "http")]
pub use self::client::HttpFetcher;

#[cfg(feature = "http")]
mod client {
    use std::{future::Future, time::Duration};

    use crate::{http::SharedClient, sns::Error};

    use super::CertificateFetcher;

    /// [`CertificateFetcher`] backed by `reqwest` with a rustls and
    /// webpki-roots TLS configuration.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: SharedClient,
        timeout: Duration,
    }

    impl Default for HttpFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpFetcher {
        pub fn new() -> Self {
            HttpFetcher {
                client: SharedClient::default(),
                timeout: Duration::from_secs(30),
            }
        }

        /// Sets the request timeout.
        pub fn timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }
    }

    impl CertificateFetcher for HttpFetcher {
        fn fetch(&self, url: &str) -> impl Future<Output = Result<String, Error>> + Send {
            async move {
                let client = self
                    .client
                    .get()
                    .await
                    .map_err(|err| Error::Fetch(err.to_string()))?;

                tokio::time::timeout(self.timeout, async {
                    let response = client
                        .get(url)
                        .send()
                        .await
                        .map_err(|err| Error::Fetch(err.to_string()))?;
                    let status = response.status();
                    if !status.is_success() {
                        return Err(Error::Fetch(status.to_string()));
                    }
                    response
                        .text()
                        .await
                        .map_err(|err| Error::Fetch(err.to_string()))
                })
                .await
                .map_err(|_| Error::Timeout)?
            }
        }
    }

}
