use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(name: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: Default::default(),
            }
            .into(),
        )
    }

    pub fn invalid_data(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    /// Parameter validation failure for a closed enumeration (bias, time unit, curve type).
    ///
    /// `legal` lists the accepted names; they are rendered in lower case.
    pub fn unknown_variant<I, S>(kind: impl Into<String>, value: impl Into<String>, legal: I) -> Error
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let legal = legal
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        Error(
            ErrorKind::UnknownVariant {
                kind: kind.into(),
                value: value.into(),
                legal,
            }
            .into(),
        )
    }

    pub fn crs_resolution<E>(code: impl Into<String>, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::CrsResolution {
                code: code.into(),
                source: source.into(),
            }
            .into(),
        )
    }

    pub fn incomplete_encoding(adapter: impl Into<String>, field: impl Into<String>) -> Error {
        Error(
            ErrorKind::IncompleteEncoding {
                adapter: adapter.into(),
                field: field.into(),
            }
            .into(),
        )
    }

    pub fn empty_extent(field: impl Into<String>) -> Error {
        Error(
            ErrorKind::EmptyExtent {
                field: field.into(),
            }
            .into(),
        )
    }

    /// Returns `true` when the error concerns a single entity and the surrounding
    /// batch can continue with the next one.
    pub fn is_entity_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::IncompleteEncoding { .. } | ErrorKind::EmptyExtent { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("value '{value}' can not be converted to {kind}, available values are: {legal}")]
    UnknownVariant {
        kind: String,
        value: String,
        legal: String,
    },

    #[error("unable to decode '{code}' CRS")]
    CrsResolution {
        code: String,
        #[source]
        source: StdErrorBoxed,
    },

    #[error("no field handler of adapter '{adapter}' supplies dimension field '{field}'")]
    IncompleteEncoding { adapter: String, field: String },

    #[error("extent of field '{field}' can not be computed")]
    EmptyExtent { field: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
