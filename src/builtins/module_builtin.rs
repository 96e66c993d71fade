// Copyright 2026 the Nodepack authors. MIT license.

//! `module` shim (spec §4.8): only the bits guest code occasionally
//! probes for. `enableCompileCache` is a documented no-op since there is
//! no persistent bytecode cache in this runtime.

use rquickjs::{Ctx, Function, Object};

use crate::error::Result;

pub fn install<'js>(ctx: &Ctx<'js>) -> Result<Object<'js>> {
  let obj = Object::new(ctx.clone())?;
  obj.set(
    "enableCompileCache",
    Function::new(ctx.clone(), move |ctx: Ctx<'js>| -> rquickjs::Result<Object<'js>> {
      let status = Object::new(ctx)?;
      status.set("status", "DISABLED")?;
      Ok(status)
    }),
  )?;
  obj.set("builtinModules", {
    let arr = rquickjs::Array::new(ctx.clone())?;
    for (i, name) in crate::module::resolver::BUILTIN_MODULES.iter().enumerate() {
      arr.set(i, *name)?;
    }
    arr
  })?;
  Ok(obj)
}
