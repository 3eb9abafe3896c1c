use base64::Engine;
use bytes::Bytes;
use image::ImageFormat;
use std::{fmt, path::Path};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// File-like input as handed over by a picker, a drop or an example fetch.
#[derive(Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl RawFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let mime_type = detect_mime_type(&name, &bytes);
        Self {
            name,
            mime_type,
            bytes,
        }
    }

    pub fn with_mime_type(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

impl fmt::Debug for RawFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Files carried by a drop gesture. May be empty.
#[derive(Debug, Clone, Default)]
pub struct DropPayload {
    pub files: Vec<RawFile>,
}

impl DropPayload {
    pub fn new(files: Vec<RawFile>) -> Self {
        Self { files }
    }
}

/// The single image currently held by the session.
#[derive(Clone, PartialEq)]
pub struct ImageCandidate {
    id: CandidateId,
    payload: Bytes,
    displayable_source: Option<String>,
    origin_filename: String,
    mime_type: String,
}

impl ImageCandidate {
    pub fn new(id: CandidateId, raw: RawFile) -> Self {
        Self {
            id,
            payload: raw.bytes,
            displayable_source: None,
            origin_filename: raw.name,
            mime_type: raw.mime_type,
        }
    }

    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// `None` until the preview has been decoded.
    pub fn displayable_source(&self) -> Option<&str> {
        self.displayable_source.as_deref()
    }

    pub fn set_displayable_source(&mut self, source: String) {
        self.displayable_source = Some(source);
    }

    pub fn origin_filename(&self) -> &str {
        &self.origin_filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Advisory upload hint. Never blocks acquisition or submission; the
    /// backend has the final word.
    pub fn upload_advisory(&self) -> Option<String> {
        let extension = Path::new(&self.origin_filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        let supported = extension
            .as_deref()
            .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e));

        if !supported {
            Some(format!(
                "{} may be rejected. Supported types: PNG, JPG, JPEG, BMP, GIF",
                self.origin_filename
            ))
        } else if self.payload.len() > MAX_UPLOAD_BYTES {
            Some(format!(
                "{} is larger than 10MB and may be rejected",
                self.origin_filename
            ))
        } else {
            None
        }
    }
}

impl fmt::Debug for ImageCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCandidate")
            .field("id", &self.id)
            .field("origin_filename", &self.origin_filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.payload.len())
            .field("preview_ready", &self.displayable_source.is_some())
            .finish()
    }
}

/// Magic bytes first, then the file extension.
pub fn detect_mime_type(name: &str, bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .ok()
        .or_else(|| ImageFormat::from_path(name).ok())
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", mime_type, b64)
}
