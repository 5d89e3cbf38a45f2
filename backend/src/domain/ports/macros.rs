//! Macro generating port error enums with snake_case constructors.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum ProbePortError {
            Unreachable { message: String } => "probe unreachable: {message}",
            SlowReply { millis: u64 } => "probe replied after {millis} ms",
            Rejected { message: String, status: u16 } => "probe rejected ({status}): {message}",
        }
    }

    #[test]
    fn string_fields_accept_str() {
        assert_eq!(
            ProbePortError::unreachable("refused").to_string(),
            "probe unreachable: refused"
        );
    }

    #[test]
    fn numeric_fields_keep_their_type() {
        assert_eq!(
            ProbePortError::slow_reply(1_500_u64).to_string(),
            "probe replied after 1500 ms"
        );
    }

    #[test]
    fn mixed_fields_are_ordered_as_declared() {
        let err = ProbePortError::rejected("maintenance", 503_u16);
        assert_eq!(err, ProbePortError::Rejected { message: "maintenance".to_owned(), status: 503 });
        assert_eq!(err.to_string(), "probe rejected (503): maintenance");
    }
}
