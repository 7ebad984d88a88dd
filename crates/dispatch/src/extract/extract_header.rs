use crate::error::{DispatchError, ParamSource};
use crate::extract::{Bind, FromValue, ParamDescriptor, bind_text};
use crate::request::RequestContext;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

/// Binds a request header; header names compare case-insensitively.
///
/// A header whose value is not visible ascii is treated as absent.
pub struct FromHeader<T> {
    pub(crate) name: &'static str,
    pub(crate) _shape: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for FromHeader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FromHeader<{}>({})", type_name::<T>(), self.name)
    }
}

impl<T: FromValue + Send + 'static> Bind for FromHeader<T> {
    type Output = T;

    fn bind(&self, ctx: &RequestContext) -> Result<T, DispatchError> {
        let raw = ctx.header_value(self.name);
        Ok(bind_text(ctx, ParamSource::Header, self.name, raw)?)
    }

    fn describe(&self, params: &mut Vec<ParamDescriptor>) {
        params.push(ParamDescriptor { name: Some(self.name), source: ParamSource::Header, shape: type_name::<T>() });
    }
}
