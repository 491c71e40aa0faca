//! Helper macro generating domain port error enums.
//!
//! Each variant gets a `thiserror` message and a snake-case constructor that
//! accepts anything convertible into the field types.

macro_rules! define_port_error {
    (@constructor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@constructor $variant:ident { $($field:ident : $ty:ty),* }) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (
        $(#[$enum_meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $({ $($field:ident : $ty:ty),* $(,)? })? => $message:literal
            ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $({ $($field: $ty),* })?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@constructor $variant $({ $($field : $ty),* })?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum SamplePortError {
            Closed => "port closed",
            Missing { key: String } => "missing: {key}",
            Busy { key: String, retries: u32 } => "busy: {key} ({retries})",
        }
    }

    #[test]
    fn unit_variant_constructor() {
        assert_eq!(SamplePortError::closed().to_string(), "port closed");
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = SamplePortError::missing("ambulance");
        assert_eq!(err.to_string(), "missing: ambulance");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = SamplePortError::busy("ambulance", 3_u32);
        assert_eq!(err.to_string(), "busy: ambulance (3)");
    }
}
