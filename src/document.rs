use std::fs;
use std::path::Path;

use crate::error::TutorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Txt,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "text" | "md" => Some(DocumentKind::Txt),
            _ => None,
        }
    }
}

/// Plain text of a reference document.
pub fn extract(bytes: &[u8], kind: DocumentKind) -> Result<String, TutorError> {
    let text = match kind {
        DocumentKind::Txt => String::from_utf8(bytes.to_vec())
            .map_err(|e| TutorError::Extraction(format!("not UTF-8 text: {e}")))?,
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| TutorError::Extraction(e.to_string()))?,
    };
    Ok(text)
}

pub fn extract_file(path: &Path) -> Result<String, TutorError> {
    let kind = DocumentKind::from_path(path).ok_or_else(|| {
        TutorError::Extraction(format!("{}: expected a .pdf or .txt file", path.display()))
    })?;
    let bytes =
        fs::read(path).map_err(|e| TutorError::Extraction(format!("{}: {e}", path.display())))?;
    extract(&bytes, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a/menu.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_path(Path::new("notes.txt")), Some(DocumentKind::Txt));
        assert_eq!(DocumentKind::from_path(Path::new("photo.png")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn text_file_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("menu.txt");
        fs::write(&path, "Coffee $3\nTea $2\n").unwrap();
        assert_eq!(extract_file(&path).unwrap(), "Coffee $3\nTea $2\n");
    }

    #[test]
    fn invalid_utf8_is_extraction_error() {
        let err = extract(&[0xff, 0xfe, 0x00], DocumentKind::Txt).unwrap_err();
        assert!(matches!(err, TutorError::Extraction(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = extract_file(Path::new("slides.pptx")).unwrap_err();
        assert!(err.to_string().contains(".pdf or .txt"));
    }
}
