// Copyright 2026 the Nodepack authors. MIT license.

//! `events` shim: `EventEmitter` (spec §4.8). Implemented as an embedded JS
//! prelude rather than a native `rquickjs` class, the way an embedder
//! installs a small polyfill for a guest-visible class whose behavior
//! (listener lists, `once` unsubscription) is purely JS-level state.

use rquickjs::{Ctx, Object};

use crate::error::{NodepackError, Result};

const PRELUDE: &str = r#"
(function () {
  class EventEmitter {
    constructor() {
      this._listeners = new Map();
    }
    on(event, listener) {
      if (!this._listeners.has(event)) this._listeners.set(event, []);
      this._listeners.get(event).push(listener);
      return this;
    }
    once(event, listener) {
      const wrapper = (...args) => {
        this.off(event, wrapper);
        listener.apply(this, args);
      };
      wrapper._original = listener;
      return this.on(event, wrapper);
    }
    off(event, listener) {
      const list = this._listeners.get(event);
      if (!list) return this;
      this._listeners.set(
        event,
        list.filter((l) => l !== listener && l._original !== listener)
      );
      return this;
    }
    removeListener(event, listener) {
      return this.off(event, listener);
    }
    emit(event, ...args) {
      const list = this._listeners.get(event);
      if (!list || list.length === 0) return false;
      for (const listener of list.slice()) listener.apply(this, args);
      return true;
    }
    listenerCount(event) {
      const list = this._listeners.get(event);
      return list ? list.length : 0;
    }
  }
  return EventEmitter;
})()
"#;

pub fn install<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
  let ctor: rquickjs::Value = ctx.eval(PRELUDE).map_err(|e| NodepackError::Script { message: e.to_string(), stack: None })?;
  let exports = Object::new(ctx.clone())?;
  exports.set("EventEmitter", ctor)?;
  Ok(exports)
}
