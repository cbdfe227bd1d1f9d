//! HMAC operations
//!
//! Full-length HMAC over any SHA-2 digest. Truncation to the algorithm's tag
//! length and the constant-time comparison happen in [`crate::symmetric`].

use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::Digest;
use hmac::{Mac, SimpleHmac};

/// Calculate HMAC over data with digest `D`
pub fn hmac_with<D>(key: &[u8], msg: &[u8]) -> Result<Vec<u8>, String>
where
    D: Digest + BlockSizeUser,
{
    let mut mac = <SimpleHmac<D> as Mac>::new_from_slice(key).map_err(|e| e.to_string())?;
    mac.update(msg);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Sha256, Sha384, Sha512};

    #[test]
    fn test_output_lengths() {
        let key = b"test_key_32_bytes_long_for_hmac!";
        assert_eq!(hmac_with::<Sha256>(key, b"data").unwrap().len(), 32);
        assert_eq!(hmac_with::<Sha384>(key, b"data").unwrap().len(), 48);
        assert_eq!(hmac_with::<Sha512>(key, b"data").unwrap().len(), 64);
    }

    #[test]
    fn test_rfc4231_case_2() {
        // key = "Jefe", data = "what do ya want for nothing?"
        let tag = hmac_with::<Sha256>(b"Jefe", b"what do ya want for nothing?").unwrap();
        let expected = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
            0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
            0x64, 0xec, 0x38, 0x43,
        ];
        assert_eq!(tag, expected);
    }

    #[test]
    fn test_deterministic() {
        let key = [3u8; 48];
        assert_eq!(
            hmac_with::<Sha384>(&key, b"m").unwrap(),
            hmac_with::<Sha384>(&key, b"m").unwrap()
        );
    }
}
