use thiserror::Error;

/// Main error type for League Contacts.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum ContactsError {
    #[error("{0}")]
    WithContextError(String),

    #[error("Log setup failed: {0}")]
    LogSetupError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    CfbHelperError(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    Biff8HelperError(#[from] crate::helpers::biff8::Biff8Error),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    OdsError(#[from] crate::spreadsheet::ods::OdsError),

    #[error("{0}")]
    XlsError(#[from] crate::spreadsheet::xls::XlsError),

    // Lookup and shell errors
    #[error("{0}")]
    LookupError(#[from] crate::lookup::LookupError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

pub(crate) trait ResultOptionChain {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self;
}

impl<T, E> ResultOptionChain for Result<Option<T>, E> {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match self {
            Ok(None) => f(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, ContactsError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| ContactsError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_none_else_falls_back_only_on_none() {
        let found: Result<Option<u8>, ContactsError> = Ok(Some(1));
        assert!(matches!(found.ok_none_else(|| Ok(Some(2))), Ok(Some(1))));

        let missing: Result<Option<u8>, ContactsError> = Ok(None);
        assert!(matches!(missing.ok_none_else(|| Ok(Some(2))), Ok(Some(2))));
    }

    #[test]
    fn with_prefix_keeps_the_cause() {
        let result: Result<(), ContactsError> = Err(std::io::Error::other("disk gone").into());
        let error = result.with_prefix("Read 'league.xls'").unwrap_err();
        assert_eq!(error.to_string(), "Read 'league.xls': disk gone");
    }
}
