use std::future::Future;

/// Represents an async function taking its arguments as a tuple
pub trait FnTrait<Args>: Send + Sync + 'static {
    type Output;
    type Future: Future<Output = Self::Output> + Send + 'static;

    fn call(&self, args: Args) -> Self::Future;
}

/// Represents a plain function taking its arguments as a tuple
pub trait SyncFnTrait<Args>: Send + Sync + 'static {
    type Output;

    fn call(&self, args: Args) -> Self::Output;
}

/// impl `Fn` for `FnTrait` and `SyncFnTrait`, From 0 parameters to 12 parameters
///
/// for example, it will impl Fn(A, B) like this:
///```ignore
/// impl<Func, Fut, A, B> FnTrait<(A, B)> for Func
///    where
///        Func: Fn(A, B) -> Fut + Send + Sync + 'static,
///        Fut: std::future::Future + Send + 'static,
/// {
///    type Output = Fut::Output;
///    type Future = Fut;
///
///    #[inline]
///    #[allow(non_snake_case)]
///    fn call(&self, (A, B): (A, B)) -> Self::Future {
///        (self)(A, B)
///    }
/// }
///```
macro_rules! impl_fn_trait_for_fn ({ $($param:ident)* } => {
    impl<Func, Fut, $($param,)*> FnTrait<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
    {
        type Output = Fut::Output;
        type Future = Fut;

        #[inline]
        #[allow(non_snake_case, reason = "type parameters double as argument names")]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Self::Future {
            (self)($($param,)*)
        }
    }

    impl<Func, Ret, $($param,)*> SyncFnTrait<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Ret + Send + Sync + 'static,
    {
        type Output = Ret;

        #[inline]
        #[allow(non_snake_case, reason = "type parameters double as argument names")]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Self::Output {
            (self)($($param,)*)
        }
    }
});

impl_fn_trait_for_fn! {}
impl_fn_trait_for_fn! { A }
impl_fn_trait_for_fn! { A B }
impl_fn_trait_for_fn! { A B C }
impl_fn_trait_for_fn! { A B C D }
impl_fn_trait_for_fn! { A B C D E }
impl_fn_trait_for_fn! { A B C D E F }
impl_fn_trait_for_fn! { A B C D E F G }
impl_fn_trait_for_fn! { A B C D E F G H }
impl_fn_trait_for_fn! { A B C D E F G H I }
impl_fn_trait_for_fn! { A B C D E F G H I J }
impl_fn_trait_for_fn! { A B C D E F G H I J K }
impl_fn_trait_for_fn! { A B C D E F G H I J K L }

/// Puts a value in front of an argument tuple, used to pass the controller instance as the
/// first argument of an action
pub trait Prepend<Head> {
    type Output;

    fn prepend(self, head: Head) -> Self::Output;
}

macro_rules! impl_prepend_for_tuple ({ $($param:ident)* } => {
    impl<Head, $($param,)*> Prepend<Head> for ($($param,)*) {
        type Output = (Head, $($param,)*);

        #[inline]
        #[allow(non_snake_case, reason = "type parameters double as argument names")]
        fn prepend(self, head: Head) -> Self::Output {
            let ($($param,)*) = self;
            (head, $($param,)*)
        }
    }
});

impl_prepend_for_tuple! {}
impl_prepend_for_tuple! { A }
impl_prepend_for_tuple! { A B }
impl_prepend_for_tuple! { A B C }
impl_prepend_for_tuple! { A B C D }
impl_prepend_for_tuple! { A B C D E }
impl_prepend_for_tuple! { A B C D E F }
impl_prepend_for_tuple! { A B C D E F G }
impl_prepend_for_tuple! { A B C D E F G H }
impl_prepend_for_tuple! { A B C D E F G H I }
impl_prepend_for_tuple! { A B C D E F G H I J }
impl_prepend_for_tuple! { A B C D E F G H I J K }
