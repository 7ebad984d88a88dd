//! Route value and query string binding.
//!
//! Route values are the verbatim text captured by `{name}` segments; query values are decoded
//! from the raw URL. Both are converted to the parameter's shape with [`FromValue`], and a
//! conversion failure is a [`BindingError`](crate::error::BindingError), never a fault.

use crate::error::{DispatchError, ParamSource};
use crate::extract::{Bind, FromValue, ParamDescriptor, bind_text};
use crate::request::RequestContext;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

pub struct FromRoute<T> {
    pub(crate) name: &'static str,
    pub(crate) _shape: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for FromRoute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FromRoute<{}>({})", type_name::<T>(), self.name)
    }
}

impl<T: FromValue + Send + 'static> Bind for FromRoute<T> {
    type Output = T;

    fn bind(&self, ctx: &RequestContext) -> Result<T, DispatchError> {
        let raw = ctx.route_values().get(self.name);
        Ok(bind_text(ctx, ParamSource::Route, self.name, raw)?)
    }

    fn describe(&self, params: &mut Vec<ParamDescriptor>) {
        params.push(ParamDescriptor { name: Some(self.name), source: ParamSource::Route, shape: type_name::<T>() });
    }
}

pub struct FromQuery<T> {
    pub(crate) name: &'static str,
    pub(crate) _shape: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for FromQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FromQuery<{}>({})", type_name::<T>(), self.name)
    }
}

impl<T: FromValue + Send + 'static> Bind for FromQuery<T> {
    type Output = T;

    fn bind(&self, ctx: &RequestContext) -> Result<T, DispatchError> {
        let raw = ctx.query_value(self.name);
        Ok(bind_text(ctx, ParamSource::Query, self.name, raw)?)
    }

    fn describe(&self, params: &mut Vec<ParamDescriptor>) {
        params.push(ParamDescriptor { name: Some(self.name), source: ParamSource::Query, shape: type_name::<T>() });
    }
}
