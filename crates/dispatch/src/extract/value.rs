use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Conversion of a route, query or header text value into a parameter's primitive shape.
///
/// `Default` supplies the zero value bound when the value is absent and the binding policy
/// allows it.
pub trait FromValue: Sized + Default {
    type Err: fmt::Display;

    fn from_value(raw: &str) -> Result<Self, Self::Err>;

    /// The value for an absent input when absence is not an error for this shape.
    fn when_absent() -> Option<Self> {
        None
    }
}

macro_rules! impl_from_value_for_from_str {
    ($($ty:ty)*) => {
        $(
        impl FromValue for $ty {
            type Err = <$ty as FromStr>::Err;

            #[inline]
            fn from_value(raw: &str) -> Result<Self, Self::Err> {
                raw.trim().parse::<$ty>()
            }
        }
        )*
    };
}

impl_from_value_for_from_str! { i8 i16 i32 i64 i128 isize u8 u16 u32 u64 u128 usize f32 f64 char }

impl FromValue for bool {
    type Err = std::str::ParseBoolError;

    fn from_value(raw: &str) -> Result<Self, Self::Err> {
        raw.trim().to_ascii_lowercase().parse()
    }
}

impl FromValue for String {
    type Err = Infallible;

    fn from_value(raw: &str) -> Result<Self, Self::Err> {
        Ok(raw.to_owned())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    type Err = T::Err;

    fn from_value(raw: &str) -> Result<Self, Self::Err> {
        T::from_value(raw).map(Some)
    }

    fn when_absent() -> Option<Self> {
        Some(None)
    }
}

#[cfg(test)]
mod tests {
    use super::FromValue;

    #[test]
    fn integers_parse_and_reject() {
        assert_eq!(i64::from_value("42").unwrap(), 42);
        assert_eq!(i32::from_value(" -7 ").unwrap(), -7);
        assert!(i64::from_value("abc").is_err());
        assert!(u8::from_value("256").is_err());
    }

    #[test]
    fn bool_ignores_case() {
        assert!(bool::from_value("True").unwrap());
        assert!(!bool::from_value("false").unwrap());
        assert!(bool::from_value("yes").is_err());
    }

    #[test]
    fn option_is_never_required() {
        assert_eq!(Option::<i32>::when_absent(), Some(None));
        assert_eq!(i32::when_absent(), None);
        assert_eq!(Option::<i32>::from_value("5").unwrap(), Some(5));
    }

    #[test]
    fn string_is_verbatim() {
        assert_eq!(String::from_value(" a b ").unwrap(), " a b ");
    }
}
