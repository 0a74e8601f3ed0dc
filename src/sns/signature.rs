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

use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::{
    pkcs1v15::{Signature, VerifyingKey},
    pkcs8::DecodePublicKey,
    signature::Verifier,
    RsaPublicKey,
};
use sha1::Sha1;
use sha2::Sha256;

use super::{
    certificate::{extract_spki, pem_to_der},
    Error,
};

/// `SignatureVersion` of an SNS message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureVersion {
    /// RSA PKCS#1 v1.5 with SHA-1.
    Sha1,
    /// RSA PKCS#1 v1.5 with SHA-256.
    Sha256,
}

impl SignatureVersion {
    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "1" => Ok(SignatureVersion::Sha1),
            "2" => Ok(SignatureVersion::Sha256),
            _ => Err(Error::UnsupportedSignatureVersion(value.to_string())),
        }
    }
}

/// Loads the RSA public key of a PEM encoded X.509 certificate.
pub fn public_key(pem: &str) -> Result<RsaPublicKey, Error> {
    let der = pem_to_der(pem)?;
    RsaPublicKey::from_public_key_der(extract_spki(&der)?)
        .map_err(|err| Error::InvalidKey(err.to_string()))
}

/// Verifies a base64 encoded signature over `data` with the key of `pem`.
///
/// Returns `Ok(false)` when the signature is well formed but does not match.
pub fn verify_pem(
    pem: &str,
    version: SignatureVersion,
    signature: &str,
    data: &str,
) -> Result<bool, Error> {
    let key = public_key(pem)?;
    let signature = STANDARD.decode(signature.trim())?;
    let signature = Signature::try_from(signature.as_slice())
        .map_err(|err| Error::InvalidSignature(err.to_string()))?;

    Ok(match version {
        SignatureVersion::Sha1 => VerifyingKey::<Sha1>::new(key)
            .verify(data.as_bytes(), &signature)
            .is_ok(),
        SignatureVersion::Sha256 => VerifyingKey::<Sha256>::new(key)
            .verify(data.as_bytes(), &signature)
            .is_ok(),
    })
}

#[cfg(test)]
pub(crate) mod test {
    use base64::{engine::general_purpose::STANDARD, Engine};

    use crate::sns::{
        certificate::test::{CERT_V1, CERT_V3},
        message::test::{notification, subscription_confirmation},
        verify_pem, Error, SignatureVersion,
    };

    pub const NOTIFICATION_SHA1: &str = "ltMMINduOx3/RVxKfDsN37C26tkMsoS6qN5akNbW51zuaO3TS4EuWw/eI7yKO1q1QkJH+KziVPV1G9GCxYxtpJ/AAKTQgaE/1iCi3VxjEmO0zQC+PBL49IWLHh1BOdI2NXWSDDWxhg8T+98rE8LFaqZxC+kdDO1Q7pQSwQGXlDQ=";
    pub const NOTIFICATION_SHA256: &str = "jTTBBF12xVb66AxWN/RIooQd7BtYTDXZKJbzxCzj948YSKKiAnKHHiB+udwsOsq0tGTvCR1mZ3f/tZhES/tce3N+G3uISVPAr12WczEZd7OndP2hICzcXJCXc7VcXSsae3xaOByOD1Nfbev5ZN/ZOUkbpj65y9ZlNVb4vCiZ3Cw=";
    pub const CONFIRMATION_SHA256: &str = "nwk+Lv2s3s9yzYdnjPShbTMyMaBr4mpavLSBcbRhKY4Fe3lsW1Pvh3UNRkJcaNCLWBtul94jsMx12IjOKqOQyxEYsmGa4VBGRFj3a8e8cDT37loXy7y6UeV5A81XseOiDJW3iEvse+DRNdYM9EjL8w6i/6Ndd/IJR6HaW7MHNxE=";

    fn flip_bit(signature: &str, pos: usize) -> String {
        let mut bytes = STANDARD.decode(signature).unwrap();
        bytes[pos] ^= 0x01;
        STANDARD.encode(bytes)
    }

    #[test]
    fn verify_signatures() {
        let notification = notification("1", "").canonical_string().unwrap();
        let confirmation = subscription_confirmation("").canonical_string().unwrap();

        for pem in [CERT_V3, CERT_V1] {
            for (version, signature, data) in [
                (SignatureVersion::Sha1, NOTIFICATION_SHA1, &notification),
                (SignatureVersion::Sha256, NOTIFICATION_SHA256, &notification),
                (SignatureVersion::Sha256, CONFIRMATION_SHA256, &confirmation),
            ] {
                assert_eq!(verify_pem(pem, version, signature, data), Ok(true));

                // Tampered signature
                for pos in [0, 64, 127] {
                    assert_eq!(
                        verify_pem(pem, version, &flip_bit(signature, pos), data),
                        Ok(false)
                    );
                }

                // Tampered data
                let mut tampered = data.clone().into_bytes();
                tampered[10] ^= 0x01;
                assert_eq!(
                    verify_pem(pem, version, signature, &String::from_utf8(tampered).unwrap()),
                    Ok(false)
                );
            }
        }

        // Wrong digest
        assert_eq!(
            verify_pem(
                CERT_V3,
                SignatureVersion::Sha256,
                NOTIFICATION_SHA1,
                &notification
            ),
            Ok(false)
        );
    }

    #[test]
    fn reject_malformed_inputs() {
        assert_eq!(
            SignatureVersion::parse("3"),
            Err(Error::UnsupportedSignatureVersion("3".into()))
        );
        assert!(matches!(
            verify_pem(CERT_V3, SignatureVersion::Sha1, "not base64!", "data"),
            Err(Error::Base64(_))
        ));
        assert!(matches!(
            verify_pem(
                "-----BEGIN CERTIFICATE-----\nMAA=\n-----END CERTIFICATE-----",
                SignatureVersion::Sha1,
                NOTIFICATION_SHA1,
                "data"
            ),
            Err(Error::Certificate(_))
        ));
    }
}
