// Copyright 2026 the Nodepack authors. MIT license.

//! `crypto` shim (spec §4.8, §8 invariants 7-10): `createHash`,
//! `createHmac`, `randomBytes`, `randomUUID`. Digest algorithms are
//! RustCrypto crates; `Hash`/`Hmac` state objects are a JS prelude that
//! accumulates chunks as hex strings and asks Rust to digest them on
//! `.digest()`, the same native-helper-plus-polyfill split the `url`
//! and `buffer` shims use.

use hmac::{Hmac, Mac};
use md5::Md5;
use rand::RngCore;
use rquickjs::{function::Opt, Ctx, Function, Object};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::builtins::buffer::{hex_decode, hex_encode};
use crate::error::{NodepackError, Result};

enum HashState {
  Sha256(Sha256),
  Sha512(Sha512),
  Sha1(Sha1),
  Md5(Md5),
}

impl HashState {
  fn new(algorithm: &str) -> Result<Self> {
    match algorithm {
      "sha256" => Ok(Self::Sha256(Sha256::new())),
      "sha512" => Ok(Self::Sha512(Sha512::new())),
      "sha1" => Ok(Self::Sha1(Sha1::new())),
      "md5" => Ok(Self::Md5(Md5::new())),
      other => Err(NodepackError::UnsupportedEncoding { encoding: format!("hash algorithm {other}") }),
    }
  }

  fn update(&mut self, data: &[u8]) {
    match self {
      Self::Sha256(h) => Digest::update(h, data),
      Self::Sha512(h) => Digest::update(h, data),
      Self::Sha1(h) => Digest::update(h, data),
      Self::Md5(h) => Digest::update(h, data),
    }
  }

  fn finalize_hex(self) -> String {
    match self {
      Self::Sha256(h) => hex_encode(&h.finalize()),
      Self::Sha512(h) => hex_encode(&h.finalize()),
      Self::Sha1(h) => hex_encode(&h.finalize()),
      Self::Md5(h) => hex_encode(&h.finalize()),
    }
  }
}

pub fn hash_hex(algorithm: &str, data: &[u8]) -> Result<String> {
  let mut state = HashState::new(algorithm)?;
  state.update(data);
  Ok(state.finalize_hex())
}

pub fn hmac_hex(algorithm: &str, key: &[u8], data: &[u8]) -> Result<String> {
  match algorithm {
    "sha256" => {
      let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key length");
      mac.update(data);
      Ok(hex_encode(&mac.finalize().into_bytes()))
    }
    "sha512" => {
      let mut mac = Hmac::<Sha512>::new_from_slice(key).expect("hmac accepts any key length");
      mac.update(data);
      Ok(hex_encode(&mac.finalize().into_bytes()))
    }
    "sha1" => {
      let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("hmac accepts any key length");
      mac.update(data);
      Ok(hex_encode(&mac.finalize().into_bytes()))
    }
    other => Err(NodepackError::UnsupportedEncoding { encoding: format!("hmac algorithm {other}") }),
  }
}

/// Host-injected randomness (spec §6, "Entropy source for
/// `randomBytes`/`randomUUID`"), so a host can swap in a deterministic
/// source for tests without the guest ever seeing the difference.
pub trait EntropySource {
  fn fill_bytes(&self, buf: &mut [u8]);
}

pub struct OsEntropySource;

impl EntropySource for OsEntropySource {
  fn fill_bytes(&self, buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
  }
}

pub fn random_bytes(entropy: &dyn EntropySource, len: usize) -> Vec<u8> {
  let mut buf = vec![0u8; len];
  entropy.fill_bytes(&mut buf);
  buf
}

/// Builds a v4 UUID by setting the RFC 4122 version/variant bits directly
/// on host-supplied random bytes, rather than depending on `uuid::new_v4`'s
/// own (unseedable) RNG — the same reason `randomBytes` takes an injected
/// [`EntropySource`].
pub fn random_uuid(entropy: &dyn EntropySource) -> String {
  let mut b = [0u8; 16];
  entropy.fill_bytes(&mut b);
  b[6] = (b[6] & 0x0f) | 0x40;
  b[8] = (b[8] & 0x3f) | 0x80;
  format!(
    "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
  )
}

// Byte chunks cross the native boundary as hex strings; `update` normalizes
// a string-or-Buffer argument to a plain array of numbers on the JS side
// (`Array.from`) before calling the native helper, avoiding any need to
// bridge `Uint8Array` into Rust directly.
const PRELUDE: &str = r#"
(function (nativeUpdateStr, nativeUpdateBytes, nativeDigest, nativeRandomBytes) {
  function chunkToHex(data, encoding) {
    return typeof data === 'string' ? nativeUpdateStr(data, encoding || 'utf8') : nativeUpdateBytes(Array.from(data));
  }
  class Hash {
    constructor(algorithm) {
      this._algorithm = algorithm;
      this._chunks = [];
    }
    update(data, encoding) {
      this._chunks.push(chunkToHex(data, encoding));
      return this;
    }
    digest(encoding) {
      return nativeDigest(this._algorithm, null, this._chunks, encoding || 'hex');
    }
  }
  class Hmac {
    constructor(algorithm, key) {
      this._algorithm = algorithm;
      this._key = chunkToHex(key, 'utf8');
      this._chunks = [];
    }
    update(data, encoding) {
      this._chunks.push(chunkToHex(data, encoding));
      return this;
    }
    digest(encoding) {
      return nativeDigest(this._algorithm, this._key, this._chunks, encoding || 'hex');
    }
  }
  return {
    createHash: (algorithm) => new Hash(algorithm),
    createHmac: (algorithm, key) => new Hmac(algorithm, key),
    randomBytes: (n) => new Uint8Array(nativeRandomBytes(n)),
  };
})
"#;

pub fn install<'js>(ctx: &Ctx<'js>, caps: &crate::runtime::HostCapabilities) -> Result<Object<'js>> {
  let factory: rquickjs::Function = ctx.eval(PRELUDE).map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;

  let update_str_fn = Function::new(ctx.clone(), |s: String, enc: String| -> rquickjs::Result<String> {
    Ok(hex_encode(&crate::builtins::buffer::encode(&s, &enc).map_err(to_js_err)?))
  })?;
  let update_bytes_fn = Function::new(ctx.clone(), |bytes: Vec<u8>| -> String { hex_encode(&bytes) })?;

  let digest_fn = Function::new(
    ctx.clone(),
    |algorithm: String, key_hex: Opt<String>, chunks: Vec<String>, out_encoding: String| -> rquickjs::Result<String> {
      let mut data = Vec::new();
      for chunk in &chunks {
        data.extend(hex_decode(chunk).map_err(to_js_err)?);
      }
      let hex = match &key_hex.0 {
        Some(key) => hmac_hex(&algorithm, &hex_decode(key).map_err(to_js_err)?, &data).map_err(to_js_err)?,
        None => hash_hex(&algorithm, &data).map_err(to_js_err)?,
      };
      match out_encoding.as_str() {
        "hex" => Ok(hex),
        "base64" => Ok(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, hex_decode(&hex).map_err(to_js_err)?)),
        other => Err(rquickjs::Error::new_from_js_message("TypeError", "value", format!("unsupported digest encoding {other}"))),
      }
    },
  )?;

  let entropy_for_bytes = caps.entropy.clone();
  let random_bytes_fn = Function::new(ctx.clone(), move |n: usize| -> Vec<u8> { random_bytes(entropy_for_bytes.as_ref(), n) })?;

  let result: Object = factory.call((update_str_fn, update_bytes_fn, digest_fn, random_bytes_fn))?;
  let entropy_for_uuid = caps.entropy.clone();
  result.set("randomUUID", Function::new(ctx.clone(), move || -> String { random_uuid(entropy_for_uuid.as_ref()) }))?;

  Ok(result)
}

fn to_js_err(e: NodepackError) -> rquickjs::Error {
  rquickjs::Error::new_from_js_message("TypeError", "value", e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sha256_matches_known_vector() {
    assert_eq!(hash_hex("sha256", b"hello world").unwrap(), "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde");
  }

  #[test]
  fn md5_matches_known_vector() {
    assert_eq!(hash_hex("md5", b"test").unwrap(), "098f6bcd4621d373cade4e832627b4f6");
  }

  #[test]
  fn hmac_sha256_matches_known_vector() {
    let got = hmac_hex("sha256", b"key", b"The quick brown fox jumps over the lazy dog").unwrap();
    assert_eq!(got, "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd");
  }

  #[test]
  fn random_uuid_matches_v4_shape() {
    let id = random_uuid(&OsEntropySource);
    let re = regex::Regex::new("^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$").unwrap();
    assert!(re.is_match(&id), "{id} did not match v4 shape");
  }

  #[test]
  fn streaming_update_matches_single_update() {
    let mut streamed = HashState::new("sha256").unwrap();
    streamed.update(b"hello ");
    streamed.update(b"world");
    assert_eq!(streamed.finalize_hex(), hash_hex("sha256", b"hello world").unwrap());
  }

  #[test]
  fn random_bytes_has_requested_length() {
    assert_eq!(random_bytes(&OsEntropySource, 16).len(), 16);
  }
}
