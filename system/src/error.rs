use std::fmt;

#[derive(Debug)]
pub enum Error {
    IncarnationExhausted,
    InvalidConfiguration(String),
    MalformedPacket(postcard::Error),
    OversizedPacket(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IncarnationExhausted => {
                write!(f, "local incarnation number cannot be incremented any further")
            }
            Error::InvalidConfiguration(reason) => {
                write!(f, "invalid configuration -> {}", reason)
            }
            Error::MalformedPacket(error) => {
                write!(f, "malformed packet -> {}", error)
            }
            Error::OversizedPacket(bytes) => {
                write!(f, "packet of {} bytes does not fit in one datagram", bytes)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedPacket(error) => Some(error),
            _ => None,
        }
    }
}

impl From<postcard::Error> for Error {
    fn from(error: postcard::Error) -> Self {
        Error::MalformedPacket(error)
    }
}
