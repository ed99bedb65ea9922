use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};
use rand::Rng;
use thiserror::Error;

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

const MAGIC: &[u8; 8] = b"Salted__";
const SALT_SIZE: usize = 8;
const HEADER_SIZE: usize = MAGIC.len() + SALT_SIZE;
const KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("ciphertext is too short")]
    TooShort,
    #[error("payload has no Salted__ header")]
    MissingHeader,
    #[error("payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("failed to decrypt payload")]
    Decrypt,
}

/// Passphrase cipher for config service bodies.
///
/// Bodies use the OpenSSL `enc` layout that CryptoJS writes for
/// `AES.encrypt(text, passphrase)`: base64 of `"Salted__" ‖ salt(8) ‖
/// ciphertext`. Key and IV come from EVP_BytesToKey (MD5, one round) over
/// the passphrase and salt. The cipher is AES-256-CBC with PKCS#7 padding.
pub struct PayloadCipher {
    passphrase: Vec<u8>,
}

impl PayloadCipher {
    pub fn from_shared_key(shared_key: &str) -> Self {
        Self {
            passphrase: shared_key.as_bytes().to_vec(),
        }
    }

    /// Encrypt under a fresh random salt.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut salt = [0u8; SALT_SIZE];
        rand::rng().fill_bytes(&mut salt);
        self.encrypt_with_salt(plaintext, salt)
    }

    fn encrypt_with_salt(&self, plaintext: &[u8], salt: [u8; SALT_SIZE]) -> Vec<u8> {
        let (key, iv) = derive_key_iv(&self.passphrase, &salt);
        let ciphertext =
            Encryptor::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut output = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
        output.extend_from_slice(MAGIC);
        output.extend_from_slice(&salt);
        output.extend_from_slice(&ciphertext);
        output
    }

    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
        if sealed.len() < HEADER_SIZE {
            return Err(CipherError::TooShort);
        }

        let (header, ciphertext) = sealed.split_at(HEADER_SIZE);
        let (magic, salt) = header.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(CipherError::MissingHeader);
        }

        let (key, iv) = derive_key_iv(&self.passphrase, salt);
        Decryptor::new(&key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::Decrypt)
    }

    /// Seal `plaintext` into the base64 body format.
    pub fn seal(&self, plaintext: &[u8]) -> String {
        STANDARD.encode(self.encrypt(plaintext))
    }

    /// Open a base64 body. Surrounding whitespace is ignored.
    pub fn open(&self, body: &str) -> Result<Vec<u8>, CipherError> {
        let sealed = STANDARD.decode(body.trim())?;
        self.decrypt(&sealed)
    }
}

/// OpenSSL's EVP_BytesToKey with MD5 and a single iteration.
fn derive_key_iv(passphrase: &[u8], salt: &[u8]) -> ([u8; KEY_SIZE], [u8; IV_SIZE]) {
    let mut material = [0u8; KEY_SIZE + IV_SIZE];
    let mut filled = 0;
    let mut previous: Option<[u8; 16]> = None;

    while filled < material.len() {
        let mut hasher = Md5::new();
        if let Some(block) = &previous {
            hasher.update(block);
        }
        hasher.update(passphrase);
        hasher.update(salt);
        let block: [u8; 16] = hasher.finalize().into();

        let take = block.len().min(material.len() - filled);
        material[filled..filled + take].copy_from_slice(&block[..take]);
        filled += take;
        previous = Some(block);
    }

    let mut key = [0u8; KEY_SIZE];
    let mut iv = [0u8; IV_SIZE];
    key.copy_from_slice(&material[..KEY_SIZE]);
    iv.copy_from_slice(&material[KEY_SIZE..]);
    (key, iv)
}
