#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Invalid(String),
    TooLarge(String),
    Io(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Invalid(msg) => write!(f, "invalid reply: {}", msg),
            ParseError::TooLarge(msg) => write!(f, "reply too large: {}", msg),
            ParseError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<std::io::Error> for ParseError {
    fn from(error: std::io::Error) -> Self {
        ParseError::Io(error.to_string())
    }
}
