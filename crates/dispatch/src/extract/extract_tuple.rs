use crate::error::DispatchError;
use crate::extract::{Bind, ParamDescriptor};
use crate::request::RequestContext;

/// impl `Bind` for tuples of descriptors, from 0 to 12 parameters
///
/// every element is bound in declaration order and the first failure aborts the binding
macro_rules! impl_bind_for_tuple {
    ($($param:ident)*) => {
        impl<$($param,)*> Bind for ($($param,)*)
        where
            $($param: Bind,)*
        {
            type Output = ($($param::Output,)*);

            #[inline]
            #[allow(non_snake_case, unused_variables, reason = "generated for every arity")]
            fn bind(&self, ctx: &RequestContext) -> Result<Self::Output, DispatchError> {
                let ($($param,)*) = self;
                Ok(($($param.bind(ctx)?,)*))
            }

            #[allow(non_snake_case, unused_variables, reason = "generated for every arity")]
            fn describe(&self, params: &mut Vec<ParamDescriptor>) {
                let ($($param,)*) = self;
                $($param.describe(params);)*
            }
        }
    };
}

impl_bind_for_tuple! {}
impl_bind_for_tuple! { A }
impl_bind_for_tuple! { A B }
impl_bind_for_tuple! { A B C }
impl_bind_for_tuple! { A B C D }
impl_bind_for_tuple! { A B C D E }
impl_bind_for_tuple! { A B C D E F }
impl_bind_for_tuple! { A B C D E F G }
impl_bind_for_tuple! { A B C D E F G H }
impl_bind_for_tuple! { A B C D E F G H I }
impl_bind_for_tuple! { A B C D E F G H I J }
impl_bind_for_tuple! { A B C D E F G H I J K }
impl_bind_for_tuple! { A B C D E F G H I J K L }
