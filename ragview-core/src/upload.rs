use std::path::{Path, PathBuf};

use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::errors::{ClientResult, ErrorKind};

pub const UNSUPPORTED_FILE_TYPE: &str = "Unsupported file type";
pub const UPLOAD_FAILED: &str = "Failed to upload file";

/// File extensions the backend knows how to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum FileKind {
    Pdf,
    Txt,
    Png,
    Jpg,
    Jpeg,
    Mp3,
}

impl FileKind {
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Txt => "txt",
            FileKind::Png => "png",
            FileKind::Jpg => "jpg",
            FileKind::Jpeg => "jpeg",
            FileKind::Mp3 => "mp3",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Txt => "text/plain",
            FileKind::Png => "image/png",
            FileKind::Jpg | FileKind::Jpeg => "image/jpeg",
            FileKind::Mp3 => "audio/mpeg",
        }
    }

    pub fn ingest_kind(self) -> IngestKind {
        match self {
            FileKind::Png | FileKind::Jpg | FileKind::Jpeg => IngestKind::Image,
            FileKind::Mp3 => IngestKind::Audio,
            FileKind::Pdf | FileKind::Txt => IngestKind::Text,
        }
    }

    /// Case-insensitive suffix match on the file name.
    pub fn classify(file_name: &str) -> ClientResult<Self> {
        let lower = file_name.to_lowercase();
        FileKind::iter()
            .find(|kind| lower.ends_with(&format!(".{}", kind.extension())))
            .ok_or_else(|| ErrorKind::UnsupportedFileType(file_name.to_string()).into())
    }

    pub fn extensions() -> Vec<&'static str> {
        FileKind::iter().map(FileKind::extension).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestKind {
    Image,
    Audio,
    Text,
}

impl IngestKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            IngestKind::Image => "/add/image",
            IngestKind::Audio => "/add/audio",
            IngestKind::Text => "/add/text",
        }
    }
}

/// A file ready to be sent as the multipart `file` field.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub kind: FileKind,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub async fn read(request: &UploadRequest) -> ClientResult<Self> {
        let bytes = tokio::fs::read(&request.path).await?;
        Ok(Self {
            file_name: request.file_name.clone(),
            kind: request.kind,
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub generation: u64,
    pub path: PathBuf,
    pub file_name: String,
    pub kind: FileKind,
}

/// What the caller must do after an upload concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEffect {
    None,
    Reprocess,
}

#[derive(Debug, Default)]
pub struct UploadDialog {
    open: bool,
    generation: u64,
    selection: Option<String>,
    error: Option<String>,
}

impl UploadDialog {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn open(&mut self) {
        self.generation += 1;
        self.open = true;
        self.selection = None;
        self.error = None;
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.open = false;
        self.selection = None;
        self.error = None;
    }

    /// Validates the chosen file. Returns a request only for supported types.
    pub fn select(&mut self, path: &Path) -> Option<UploadRequest> {
        self.generation += 1;
        self.error = None;
        self.selection = None;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = match FileKind::classify(&file_name) {
            Ok(kind) => kind,
            Err(err) => {
                tracing::warn!("Rejected upload: {err}");
                self.error = Some(UNSUPPORTED_FILE_TYPE.to_string());
                return None;
            }
        };

        self.selection = Some(file_name.clone());
        Some(UploadRequest {
            generation: self.generation,
            path: path.to_path_buf(),
            file_name,
            kind,
        })
    }

    pub fn complete(&mut self, generation: u64, result: &ClientResult<()>) -> UploadEffect {
        let current = self.open && generation == self.generation;
        if current {
            self.selection = None;
        }
        match result {
            Ok(()) => {
                if current {
                    self.open = false;
                    self.error = None;
                }
                UploadEffect::Reprocess
            }
            Err(err) => {
                tracing::error!("Upload failed: {err}");
                if current {
                    self.error = Some(UPLOAD_FAILED.to_string());
                }
                UploadEffect::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error() -> ClientResult<()> {
        Err(ErrorKind::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into())
    }

    #[test]
    fn classify_is_case_insensitive() {
        let classify = |name: &str| FileKind::classify(name).ok();
        assert_eq!(classify("photo.PNG"), Some(FileKind::Png));
        assert_eq!(
            classify("photo.PNG").map(|k| k.ingest_kind().endpoint()),
            Some("/add/image")
        );
        assert_eq!(classify("Cry.Mp3").map(|k| k.ingest_kind()), Some(IngestKind::Audio));
        assert_eq!(classify("notes.txt").map(|k| k.ingest_kind()), Some(IngestKind::Text));
        assert_eq!(classify("dex.PDF").map(|k| k.ingest_kind()), Some(IngestKind::Text));
        assert_eq!(classify("a.JPEG").map(|k| k.mime()), Some("image/jpeg"));
    }

    #[test]
    fn classify_rejects_everything_else() {
        for name in ["archive.zip", "movie.mp4", "png", "photo.png.bak", "noext", "", "x.jpgx"] {
            let err = FileKind::classify(name).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::UnsupportedFileType(rejected) if rejected == name),
                "{name}"
            );
        }
    }

    #[test]
    fn unsupported_selection_issues_nothing() {
        let mut dialog = UploadDialog::default();
        dialog.open();
        assert!(dialog.select(Path::new("/tmp/team.gif")).is_none());
        assert_eq!(dialog.error(), Some(UNSUPPORTED_FILE_TYPE));
        assert_eq!(dialog.selection(), None);
        assert!(dialog.is_open());
    }

    #[test]
    fn success_closes_and_requests_reprocess() {
        let mut dialog = UploadDialog::default();
        dialog.open();
        let request = dialog.select(Path::new("/data/bulbasaur.png")).unwrap();
        assert_eq!(request.file_name, "bulbasaur.png");
        assert_eq!(dialog.selection(), Some("bulbasaur.png"));

        let effect = dialog.complete(request.generation, &Ok(()));
        assert_eq!(effect, UploadEffect::Reprocess);
        assert!(!dialog.is_open());
        assert_eq!(dialog.selection(), None);
    }

    #[test]
    fn failure_keeps_dialog_open_with_error() {
        let mut dialog = UploadDialog::default();
        dialog.open();
        let request = dialog.select(Path::new("dex.pdf")).unwrap();
        let effect = dialog.complete(request.generation, &status_error());
        assert_eq!(effect, UploadEffect::None);
        assert!(dialog.is_open());
        assert_eq!(dialog.error(), Some(UPLOAD_FAILED));
        assert_eq!(dialog.selection(), None);
    }

    #[test]
    fn reopening_starts_clean() {
        let mut dialog = UploadDialog::default();
        dialog.open();
        dialog.select(Path::new("x.exe"));
        dialog.cancel();
        dialog.open();
        assert_eq!(dialog.error(), None);
        assert_eq!(dialog.selection(), None);
    }

    #[test]
    fn stale_completion_leaves_dialog_alone_but_still_reprocesses() {
        let mut dialog = UploadDialog::default();
        dialog.open();
        let request = dialog.select(Path::new("a.txt")).unwrap();
        dialog.cancel();
        dialog.open();

        let effect = dialog.complete(request.generation, &Ok(()));
        assert_eq!(effect, UploadEffect::Reprocess);
        assert!(dialog.is_open());

        let effect = dialog.complete(request.generation, &status_error());
        assert_eq!(effect, UploadEffect::None);
        assert_eq!(dialog.error(), None);
    }
}
