use crate::REQUIRED_VARIANTS;
use proc_macro2::Span;
use syn::Error;
use std::fmt;

pub enum VerificationError {
    NotDependent(String),
    OneRequiredVariant,
    NotUnit(String),
    SplitRename(String),
    RenameAll,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use VerificationError::*;
        match self {
            NotDependent(s) => write!(f, "{s} is the happy condition and may not be a dependent"),
            OneRequiredVariant => write!(
                f,
                "ConditionType must contain exactly one {} variant",
                REQUIRED_VARIANTS.join(" or ")
            ),
            NotUnit(s) => write!(f, "ConditionType variant {s} may not have fields"),
            SplitRename(s) => write!(
                f,
                "ConditionType variant {s} must use the same name for serialize and deserialize"
            ),
            RenameAll => write!(f, "ConditionType does not support serde(rename_all), rename variants instead"),
        }
    }
}

impl VerificationError {
    pub fn spanned(self, span: Span) -> Error {
        Error::new(span, self)
    }
}

impl From<VerificationError> for Error {
    fn from(v: VerificationError) -> Error {
        Error::new(Span::call_site(), v)
    }
}
