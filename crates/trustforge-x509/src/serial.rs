//! Random certificate serial numbers.

use openssl::asn1::Asn1Integer;
use openssl::bn::BigNum;

use crate::error::X509Error;

const SERIAL_BYTES: usize = 16;

/// A 128-bit positive certificate serial number.
#[derive(Debug, Clone)]
pub struct SerialNumber {
    bytes: [u8; SERIAL_BYTES],
    hex: String,
}

impl SerialNumber {
    /// Generate a fresh random serial. The top bit is cleared so the
    /// DER integer encoding stays positive without padding.
    pub fn generate() -> Result<Self, X509Error> {
        let mut bytes = [0u8; SERIAL_BYTES];
        openssl::rand::rand_bytes(&mut bytes)?;
        bytes[0] &= 0x7F;
        let hex = hex::encode_upper(bytes);
        Ok(Self { bytes, hex })
    }

    /// Uppercase hex rendering, as persisted and exposed to callers.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn to_asn1(&self) -> Result<Asn1Integer, X509Error> {
        let bn = BigNum::from_slice(&self.bytes)?;
        Ok(bn.to_asn1_integer()?)
    }
}
