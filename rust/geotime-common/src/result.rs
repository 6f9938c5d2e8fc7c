pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns an `InvalidArgument` error naming `$name` unless `$cond` holds.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $cond:expr) => {
        if !$cond {
            return Err($crate::error::Error::invalid_arg(
                stringify!($name),
                stringify!($cond),
            ));
        }
    };
}

/// Returns an `InvalidFormat` error naming `$name` unless `$cond` holds.
/// Used for malformed serialized input.
#[macro_export]
macro_rules! verify_data {
    ($name:expr, $cond:expr) => {
        if !$cond {
            return Err($crate::error::Error::invalid_data(
                stringify!($name),
                stringify!($cond),
            ));
        }
    };
}
