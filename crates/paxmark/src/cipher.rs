//! Fernet tokens for the session file.
//!
//! A key is 32 bytes: the first half signs, the second half encrypts. A
//! token is `0x80 || timestamp (u64 BE) || IV (16) || AES-128-CBC/PKCS#7
//! ciphertext || HMAC-SHA256`, encoded as url-safe base64 with padding.
//! Timestamps are written but never checked on decrypt.

use aes::Aes128;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::StoreError;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

const VERSION: u8 = 0x80;
const BLOCK: usize = 16;
const TAG_LEN: usize = 32;
/// Version byte, timestamp and IV.
const HEADER_LEN: usize = 1 + 8 + BLOCK;

/// Url-safe base64 that writes padding and accepts it missing.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A Fernet key.
#[derive(Clone, PartialEq, Eq)]
pub struct FernetKey {
    signing: [u8; 16],
    encryption: [u8; 16],
}

impl std::fmt::Debug for FernetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FernetKey(..)")
    }
}

impl FernetKey {
    /// A new random key.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8; 32]) -> Self {
        let mut signing = [0u8; 16];
        let mut encryption = [0u8; 16];
        signing.copy_from_slice(&bytes[..16]);
        encryption.copy_from_slice(&bytes[16..]);
        Self {
            signing,
            encryption,
        }
    }

    /// Parse the textual key form; surrounding whitespace is ignored.
    pub fn decode(text: &str) -> Result<Self, StoreError> {
        let bytes = URL_SAFE_LENIENT
            .decode(text.trim())
            .map_err(|e| StoreError::Key(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| StoreError::Key(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self::from_bytes(&bytes))
    }

    /// The textual key form written to the key file.
    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(32);
        bytes.extend_from_slice(&self.signing);
        bytes.extend_from_slice(&self.encryption);
        URL_SAFE_LENIENT.encode(bytes)
    }

    /// Encrypt `plaintext` with a fresh IV and the current time.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, StoreError> {
        let timestamp = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        self.encrypt_with(plaintext, timestamp, rand::random())
    }

    fn encrypt_with(
        &self,
        plaintext: &[u8],
        timestamp: u64,
        iv: [u8; BLOCK],
    ) -> Result<String, StoreError> {
        let len = plaintext.len();
        let mut buf = plaintext.to_vec();
        buf.resize(len + BLOCK - len % BLOCK, 0);
        let cipher = Aes128CbcEnc::new_from_slices(&self.encryption, &iv)
            .map_err(|e| StoreError::Key(e.to_string()))?;
        let ciphertext = cipher
            .encrypt_padded_mut::<Pkcs7>(&mut buf, len)
            .map_err(|_| StoreError::Decrypt("padding failed".to_string()))?;

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&iv);
        token.extend_from_slice(ciphertext);
        let tag = self.sign(&token)?;
        token.extend_from_slice(&tag);
        Ok(URL_SAFE_LENIENT.encode(token))
    }

    /// Verify and decrypt a token.
    pub fn decrypt(&self, token: &[u8]) -> Result<Vec<u8>, StoreError> {
        let text = std::str::from_utf8(token)
            .map_err(|_| StoreError::Decrypt("token is not text".to_string()))?;
        let raw = URL_SAFE_LENIENT
            .decode(text.trim())
            .map_err(|e| StoreError::Decrypt(e.to_string()))?;
        if raw.len() < HEADER_LEN + BLOCK + TAG_LEN || raw[0] != VERSION {
            return Err(StoreError::Decrypt("malformed token".to_string()));
        }
        let (signed, tag) = raw.split_at(raw.len() - TAG_LEN);
        let mut mac = self.mac()?;
        mac.update(signed);
        mac.verify_slice(tag)
            .map_err(|_| StoreError::Decrypt("signature mismatch".to_string()))?;

        let iv = &signed[9..HEADER_LEN];
        let mut ciphertext = signed[HEADER_LEN..].to_vec();
        if ciphertext.len() % BLOCK != 0 {
            return Err(StoreError::Decrypt("ciphertext is not block aligned".to_string()));
        }
        let cipher = Aes128CbcDec::new_from_slices(&self.encryption, iv)
            .map_err(|e| StoreError::Key(e.to_string()))?;
        let plaintext = cipher
            .decrypt_padded_mut::<Pkcs7>(&mut ciphertext)
            .map_err(|_| StoreError::Decrypt("bad padding".to_string()))?;
        Ok(plaintext.to_vec())
    }

    fn mac(&self) -> Result<HmacSha256, StoreError> {
        HmacSha256::new_from_slice(&self.signing).map_err(|e| StoreError::Key(e.to_string()))
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
