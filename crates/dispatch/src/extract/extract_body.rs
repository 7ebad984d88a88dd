//! Request body binding.
//!
//! The body is treated as JSON regardless of the request's content type. An empty body is an
//! absent value and follows the binding policy; a malformed one is a [`BindingError`].

use crate::error::{BindingError, DispatchError, ParamSource};
use crate::extract::{Bind, MissingValue, ParamDescriptor, json};
use crate::request::RequestContext;
use serde::de::DeserializeOwned;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use tracing::trace;

pub struct FromBody<T> {
    pub(crate) _shape: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for FromBody<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FromBody<{}>", type_name::<T>())
    }
}

impl<T> Bind for FromBody<T>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    type Output = T;

    fn bind(&self, ctx: &RequestContext) -> Result<T, DispatchError> {
        let body = ctx.body();
        if body.iter().all(u8::is_ascii_whitespace) {
            return match ctx.binding_policy().missing {
                MissingValue::UseDefault => Ok(T::default()),
                MissingValue::Reject => Err(BindingError::missing(ParamSource::Body, "body").into()),
            };
        }

        trace!(shape = type_name::<T>(), len = body.len(), "deserialize request body");
        json::from_slice::<T>(body).map_err(|e| BindingError::body(e).into())
    }

    fn describe(&self, params: &mut Vec<ParamDescriptor>) {
        params.push(ParamDescriptor { name: None, source: ParamSource::Body, shape: type_name::<T>() });
    }
}
