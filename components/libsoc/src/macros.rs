/// Declares an enum that mirrors one of libsoc's C enumerations.
///
/// Each variant carries the integer the native library uses for it and one or more names it can be
/// parsed from. The first name is used for display.
macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $raw:literal => $text:literal $(| $alias:literal)*,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// The value libsoc uses for this variant.
            pub fn to_raw(self) -> i32 {
                match self {
                    $($name::$variant => $raw,)+
                }
            }
        }

        impl std::convert::TryFrom<i32> for $name {
            type Error = crate::Error;

            fn try_from(raw: i32) -> crate::Result<$name> {
                match raw {
                    $($raw => Ok($name::$variant),)+
                    _ => Err(crate::Error::InvalidArgument(
                        format!("invalid {} value: {}", stringify!($name), raw)
                    )),
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<$name> {
                match s.to_ascii_lowercase().as_str() {
                    $($text $(| $alias)* => Ok($name::$variant),)+
                    _ => Err(crate::Error::InvalidArgument(
                        format!("invalid {}: \"{}\"", stringify!($name), s)
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let text = match self {
                    $($name::$variant => $text,)+
                };
                f.write_str(text)
            }
        }
    };
}
