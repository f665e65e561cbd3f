// Multipart body encoders

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

use crate::error::Result;

/// Field name of the file part in multi-field uploads
pub const FILE_FIELD: &str = "file";

/// Where the uploaded file content comes from
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    /// In-memory content, cheap to clone for a retry
    Bytes(Bytes),

    /// File on disk, streamed and re-opened for every attempt
    Path(PathBuf),
}

impl FileSource {
    /// Base name of a path source
    pub fn file_name(&self) -> Option<String> {
        match self {
            FileSource::Bytes(_) => None,
            FileSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
    }

    /// Build a fresh part for this source
    ///
    /// Path sources open a new read stream each time. The file handle is
    /// owned by the request body and released when the body is dropped,
    /// whether the send succeeded or not.
    async fn to_part(&self) -> Result<Part> {
        match self {
            FileSource::Bytes(bytes) => Ok(Part::stream_with_length(
                bytes.clone(),
                bytes.len() as u64,
            )),
            FileSource::Path(path) => {
                let file = tokio::fs::File::open(path).await?;
                let length = file.metadata().await?.len();
                tracing::debug!(path = %path.display(), length, "Streaming file part");
                let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
                Ok(Part::stream_with_length(body, length))
            }
        }
    }
}

impl From<Vec<u8>> for FileSource {
    fn from(bytes: Vec<u8>) -> Self {
        FileSource::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for FileSource {
    fn from(bytes: Bytes) -> Self {
        FileSource::Bytes(bytes)
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        FileSource::Path(path)
    }
}

impl From<&Path> for FileSource {
    fn from(path: &Path) -> Self {
        FileSource::Path(path.to_path_buf())
    }
}

/// Form with a single file part named `field_name`
pub async fn build_single_file_form(
    field_name: &str,
    source: &FileSource,
    file_name: &str,
) -> Result<Form> {
    let part = source.to_part().await?.file_name(file_name.to_string());
    Ok(Form::new().part(field_name.to_string(), part))
}

/// Form with the `file` part followed by scalar fields in the given order
pub async fn build_multi_field_form(
    source: &FileSource,
    fields: &[(String, String)],
) -> Result<Form> {
    let file_name = source
        .file_name()
        .unwrap_or_else(|| FILE_FIELD.to_string());
    let part = source.to_part().await?.file_name(file_name);

    let mut form = Form::new().part(FILE_FIELD, part);
    for (key, value) in fields {
        form = form.text(key.clone(), value.clone());
    }
    Ok(form)
}
