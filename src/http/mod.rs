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

//! HTTPS collaborators: the SES send client and the certificate fetcher
//! transport.

pub mod ses;
pub mod sigv4;

pub use ses::SesClient;

use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::TrustAnchor;
use tokio::sync::OnceCell;

/// TLS configuration trusting the Mozilla root certificates.
pub fn build_tls_config() -> ClientConfig {
    let mut root_cert_store = RootCertStore::empty();

    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| TrustAnchor {
        subject: ta.subject.clone(),
        subject_public_key_info: ta.subject_public_key_info.clone(),
        name_constraints: ta.name_constraints.clone(),
    }));

    ClientConfig::builder()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth()
}

pub(crate) fn build_client() -> crate::Result<reqwest::Client> {
    reqwest::Client::builder()
        .use_preconfigured_tls(build_tls_config())
        .build()
        .map_err(|err| crate::Error::Transport(err.to_string()))
}

/// `reqwest::Client` built on first use and shared by every clone, so
/// requests reuse pooled connections.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedClient(Arc<OnceCell<reqwest::Client>>);

impl SharedClient {
    pub(crate) async fn get(&self) -> crate::Result<&reqwest::Client> {
        self.0.get_or_try_init(|| async { build_client() }).await
    }
}
