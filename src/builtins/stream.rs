// Copyright 2026 the Nodepack authors. MIT license.

//! `stream` shim (spec §4.8): `Readable`, `Writable`, `Transform` as
//! synchronous, in-memory classes. There is no event loop backing this
//! runtime (spec §5), so these implement the synchronous subset of the
//! Node stream API: `write`/`read`/`end` and `data`/`end` events emitted
//! inline via the `events` shim's `EventEmitter`.

use rquickjs::{Ctx, Object};

use crate::error::{NodepackError, Result};

const PRELUDE: &str = r#"
(function (EventEmitter) {
  class Readable extends EventEmitter {
    constructor(options) {
      super();
      this._buffered = [];
      this._ended = false;
      if (options && typeof options.read === 'function') this._read = options.read;
    }
    push(chunk) {
      if (chunk === null) {
        this._ended = true;
        this.emit('end');
        return false;
      }
      this._buffered.push(chunk);
      this.emit('data', chunk);
      return true;
    }
    read() {
      return this._buffered.shift();
    }
    pipe(destination) {
      this.on('data', (chunk) => destination.write(chunk));
      this.on('end', () => destination.end());
      return destination;
    }
  }

  class Writable extends EventEmitter {
    constructor(options) {
      super();
      this._chunks = [];
      this._ended = false;
      if (options && typeof options.write === 'function') this._write = options.write;
    }
    write(chunk, encoding, callback) {
      if (typeof encoding === 'function') { callback = encoding; }
      this._chunks.push(chunk);
      if (this._write) this._write(chunk, encoding, callback || (() => {}));
      else if (callback) callback();
      return true;
    }
    end(chunk) {
      if (chunk !== undefined) this.write(chunk);
      this._ended = true;
      this.emit('finish');
    }
  }

  class Transform extends Writable {
    constructor(options) {
      super(options);
      this._readable = new Readable();
      if (options && typeof options.transform === 'function') this._transform = options.transform;
    }
    write(chunk, encoding, callback) {
      if (typeof encoding === 'function') { callback = encoding; }
      if (this._transform) {
        this._transform(chunk, encoding, (err, out) => {
          if (out !== undefined) this._readable.push(out);
          if (callback) callback(err);
        });
      } else {
        this._readable.push(chunk);
        if (callback) callback();
      }
      return true;
    }
    read() {
      return this._readable.read();
    }
    on(event, listener) {
      if (event === 'data' || event === 'end') {
        this._readable.on(event, listener);
        return this;
      }
      return super.on(event, listener);
    }
    pipe(destination) {
      return this._readable.pipe(destination);
    }
    end(chunk) {
      super.end(chunk);
      this._readable.push(null);
    }
  }

  return { Readable, Writable, Transform };
})
"#;

pub fn install<'js>(ctx: &Ctx<'js>, event_emitter: rquickjs::Value<'js>) -> Result<Object<'js>> {
  let factory: rquickjs::Function = ctx.eval(PRELUDE).map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;
  let result: Object = factory.call((event_emitter,))?;
  Ok(result)
}
