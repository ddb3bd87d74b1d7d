use std::{error::Error, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    StructWithEnum,
    ConstantWithEnum,
    ConstantWithStruct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    InvalidOptions { msg: String },
    MalformedInput { msg: String },
    NamingConflict { conflict: Conflict, name: String },
    Capability { msg: String },
    Render { file: String, msg: String, partial: String },
}

impl GenError {
    pub(crate) fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions { msg: msg.into() }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput { msg: msg.into() }
    }

    pub(crate) fn capability(msg: impl Into<String>) -> Self {
        Self::Capability { msg: msg.into() }
    }

    /// Rendered text of the file that failed, if the failure happened after rendering.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            GenError::Render { partial, .. } if !partial.is_empty() => Some(partial),
            _ => None,
        }
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::InvalidOptions { msg } => write!(f, "invalid options: {msg}"),
            GenError::MalformedInput { msg } => write!(f, "{msg}"),
            GenError::NamingConflict { conflict, name } => match conflict {
                Conflict::StructWithEnum => {
                    write!(f, "struct name conflicts with enum name: {name}")
                }
                Conflict::ConstantWithEnum => {
                    write!(f, "query constant name conflicts with enum name: {name}")
                }
                Conflict::ConstantWithStruct => {
                    write!(f, "query constant name conflicts with struct name: {name}")
                }
            },
            GenError::Capability { msg } => write!(f, "{msg}"),
            GenError::Render { file, msg, .. } => write!(f, "{file}: source error: {msg}"),
        }
    }
}

impl Error for GenError {}
