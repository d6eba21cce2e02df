/// Defines a newtype ID wrapper around a database primary key scalar
/// (typically `i64`) and generates:
/// - derives (Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)
/// - `Display`
/// - `From<$inner> for $name` and `From<$name> for $inner`
///
/// The wrapper serializes as the bare scalar, so `ArticleId(7)` is `7` on the wire.
///
/// Usage:
///   define_id_type!(i64, ArticleId);
#[macro_export]
macro_rules! define_id_type {
    ($inner:ty, $name:ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl ::std::convert::From<$inner> for $name {
            fn from(v: $inner) -> Self {
                $name(v)
            }
        }

        impl ::std::convert::From<$name> for $inner {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl $name {
            pub fn new(value: $inner) -> Self {
                $name(value)
            }

            pub fn value(&self) -> $inner {
                self.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    define_id_type!(i64, WidgetId);

    #[test]
    fn test_id_round_trips_through_json_as_scalar() {
        let id = WidgetId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: WidgetId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
        assert_eq!(i64::from(back), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_id_defaults_to_zero() {
        assert_eq!(WidgetId::default(), WidgetId::new(0));
    }
}
