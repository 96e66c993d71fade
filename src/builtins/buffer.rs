// Copyright 2026 the Nodepack authors. MIT license.

//! `buffer` shim: `Buffer extends Uint8Array` (spec §4.8). Byte<->string
//! conversion is done in Rust and exposed as native helpers; the `Buffer`
//! class itself is a small JS prelude over `Uint8Array`, the same
//! native-helper-plus-polyfill split used by the `url` shim.

use rquickjs::{Ctx, Function, Object};

use crate::error::{NodepackError, Result};

// `Buffer` stays a real `Uint8Array` subclass (spec §4.8). Byte arrays
// cross the native boundary as plain JS arrays of numbers -- `Vec<u8>`'s
// confirmed `IntoJs`/`FromJs` array mapping -- and `Array.from`/the
// `Uint8Array` constructor convert to/from the typed array on the JS side,
// so no native typed-array bridging is needed.
const PRELUDE: &str = r#"
(function (encodeUtf8, decodeUtf8) {
  class Buffer extends Uint8Array {
    static from(value, encoding) {
      if (typeof value === 'string') {
        return new Buffer(encodeUtf8(value, encoding || 'utf8'));
      }
      return new Buffer(value);
    }
    static alloc(size, fill) {
      const buf = new Buffer(size);
      if (fill !== undefined) buf.fill(fill);
      return buf;
    }
    static isBuffer(value) {
      return value instanceof Buffer;
    }
    toString(encoding) {
      return decodeUtf8(Array.from(this), encoding || 'utf8');
    }
  }
  return Buffer;
})
"#;

pub(crate) fn encode(input: &str, encoding: &str) -> Result<Vec<u8>> {
  match encoding {
    "utf8" | "utf-8" => Ok(input.as_bytes().to_vec()),
    "hex" => hex_decode(input),
    "base64" => base64::Engine::decode(&base64::engine::general_purpose::STANDARD, input)
      .map_err(|e| NodepackError::UnsupportedEncoding { encoding: format!("base64: {e}") }),
    other => Err(NodepackError::UnsupportedEncoding { encoding: other.to_string() }),
  }
}

fn decode(bytes: &[u8], encoding: &str) -> Result<String> {
  match encoding {
    "utf8" | "utf-8" => Ok(String::from_utf8_lossy(bytes).into_owned()),
    "hex" => Ok(hex_encode(bytes)),
    "base64" => Ok(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)),
    other => Err(NodepackError::UnsupportedEncoding { encoding: other.to_string() }),
  }
}

pub fn hex_encode(bytes: &[u8]) -> String {
  bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn hex_decode(input: &str) -> Result<Vec<u8>> {
  if input.len() % 2 != 0 {
    return Err(NodepackError::UnsupportedEncoding { encoding: "hex".to_string() });
  }
  (0..input.len())
    .step_by(2)
    .map(|i| u8::from_str_radix(&input[i..i + 2], 16).map_err(|_| NodepackError::UnsupportedEncoding { encoding: "hex".to_string() }))
    .collect()
}

pub fn install<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
  let factory: rquickjs::Function = ctx.eval(PRELUDE).map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;

  let encode_fn = Function::new(ctx.clone(), |s: String, enc: String| -> rquickjs::Result<Vec<u8>> {
    encode(&s, &enc).map_err(|e| rquickjs::Error::new_from_js_message("TypeError", "value", e.to_string()))
  })?;

  let decode_fn = Function::new(ctx.clone(), |bytes: Vec<u8>, enc: String| -> rquickjs::Result<String> {
    decode(&bytes, &enc).map_err(|e| rquickjs::Error::new_from_js_message("TypeError", "value", e.to_string()))
  })?;

  let ctor: Object = factory.call((encode_fn, decode_fn))?;
  let exports = Object::new(ctx.clone())?;
  exports.set("Buffer", ctor)?;
  Ok(exports)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hex_round_trips() {
    let bytes = vec![0xde, 0xad, 0xbe, 0xef];
    assert_eq!(hex_encode(&bytes), "deadbeef");
    assert_eq!(hex_decode("deadbeef").unwrap(), bytes);
  }

  #[test]
  fn utf8_encode_decode_round_trips() {
    let encoded = encode("hello", "utf8").unwrap();
    assert_eq!(decode(&encoded, "utf8").unwrap(), "hello");
  }

  #[test]
  fn unsupported_encoding_errs() {
    assert!(encode("x", "latin1").is_err());
  }
}
