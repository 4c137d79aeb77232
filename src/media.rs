//! Image acquisition from the camera or the photo library
//!
//! A [`MediaSource`] stands in for the device picker. [`pick_image`] runs the
//! permission check followed by the picker and turns a denial into an
//! actionable error. A cancelled pick is `Ok(None)` and changes nothing.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use image::ImageFormat;

use crate::config::MediaConfig;
use crate::error::{FoodVisionError, Result};
use crate::vision::PickedImage;

/// MIME type used when neither the content nor the name says otherwise.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// File name used when the picker reports none.
pub const DEFAULT_FILE_NAME: &str = "image.jpg";

/// Where an image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Camera,
    Library,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Library => write!(f, "library"),
        }
    }
}

/// Result of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The source does not exist on this device.
    Unavailable,
}

/// Device picker abstraction.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Asks for access to `kind`.
    async fn request_permission(&self, kind: SourceKind) -> Result<PermissionStatus>;

    /// Opens the picker; `None` when the user cancels.
    async fn launch(&self, kind: SourceKind) -> Result<Option<PickedImage>>;
}

/// Requests permission for `kind` and launches the picker.
///
/// # Errors
///
/// Returns [`FoodVisionError::PermissionDenied`] with instructions when
/// access is refused or the source is unavailable.
pub async fn pick_image(source: &dyn MediaSource, kind: SourceKind) -> Result<Option<PickedImage>> {
    match source.request_permission(kind).await? {
        PermissionStatus::Granted => {}
        PermissionStatus::Denied => {
            tracing::warn!(source = %kind, "Permission denied");
            return Err(FoodVisionError::PermissionDenied(denied_message(kind).to_string()).into());
        }
        PermissionStatus::Unavailable => {
            tracing::warn!(source = %kind, "Source unavailable");
            return Err(
                FoodVisionError::PermissionDenied(unavailable_message(kind).to_string()).into(),
            );
        }
    }

    let picked = source.launch(kind).await?;
    match &picked {
        Some(image) => tracing::info!(
            source = %kind,
            file = %image.file_name,
            mime = %image.mime_type,
            "Image picked"
        ),
        None => tracing::debug!(source = %kind, "Pick cancelled"),
    }
    Ok(picked)
}

fn denied_message(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Camera => {
            "We need camera permissions to take photos. Please enable it in your device settings."
        }
        SourceKind::Library => {
            "We need gallery permissions to select images. Please enable it in your device settings."
        }
    }
}

fn unavailable_message(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Camera => {
            "No camera is configured. Set media.capture_command or use the library instead."
        }
        SourceKind::Library => "No image file was given. Please select an image file.",
    }
}

// ----------------------------------------------------------------------------
// Local filesystem source
// ----------------------------------------------------------------------------

/// [`MediaSource`] backed by the local machine.
///
/// The library is a file path chosen up front. The camera is an external
/// command (`media.capture_command`) whose `{output}` placeholder is replaced
/// with the path the captured image must be written to.
#[derive(Debug, Clone, Default)]
pub struct LocalMediaSource {
    capture_command: Option<String>,
    library_file: Option<PathBuf>,
}

impl LocalMediaSource {
    /// Source using the configured capture command and no library file.
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            capture_command: config.capture_command.clone(),
            library_file: None,
        }
    }

    /// Selects the file the library picker returns.
    pub fn with_library_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_file = Some(path.into());
        self
    }

    async fn capture(&self, command: &str) -> Result<Option<PickedImage>> {
        let output = capture_output_path();
        let mut args = expand_capture_command(command, &output);
        if args.is_empty() {
            return Err(FoodVisionError::Config("media.capture_command is empty".into()).into());
        }
        let program = args.remove(0);

        tracing::debug!(program = %program, output = %output.display(), "Running capture command");
        let status = tokio::process::Command::new(&program)
            .args(&args)
            .status()
            .await
            .map_err(|e| {
                FoodVisionError::Config(format!("Failed to run capture command `{}`: {}", program, e))
            })?;

        if !status.success() || !output.exists() {
            tracing::info!(code = ?status.code(), "Capture produced no image");
            discard_capture_output(&output).await;
            return Ok(None);
        }

        let image = read_picked_image(&output).await;
        discard_capture_output(&output).await;
        image.map(Some)
    }
}

async fn discard_capture_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove capture file {}: {}", output.display(), e),
    }
}

#[async_trait]
impl MediaSource for LocalMediaSource {
    async fn request_permission(&self, kind: SourceKind) -> Result<PermissionStatus> {
        let status = match kind {
            SourceKind::Camera if self.capture_command.is_some() => PermissionStatus::Granted,
            SourceKind::Camera => PermissionStatus::Unavailable,
            SourceKind::Library => PermissionStatus::Granted,
        };
        Ok(status)
    }

    async fn launch(&self, kind: SourceKind) -> Result<Option<PickedImage>> {
        match kind {
            SourceKind::Camera => match &self.capture_command {
                Some(command) => self.capture(command).await,
                None => Ok(None),
            },
            SourceKind::Library => match &self.library_file {
                Some(path) => read_picked_image(path).await.map(Some),
                None => Ok(None),
            },
        }
    }
}

fn capture_output_path() -> PathBuf {
    let stamp = chrono::Utc::now().timestamp_millis();
    std::env::temp_dir().join(format!("foodvision-capture-{}-{}.jpg", std::process::id(), stamp))
}

/// Splits the capture command into program and arguments, substituting
/// `{output}`. Without a placeholder the output path is appended.
pub fn expand_capture_command(command: &str, output: &Path) -> Vec<String> {
    let output = output.display().to_string();
    let mut substituted = false;
    let mut args: Vec<String> = command
        .split_whitespace()
        .map(|token| {
            if token.contains("{output}") {
                substituted = true;
                token.replace("{output}", &output)
            } else {
                token.to_string()
            }
        })
        .collect();
    if !substituted && !args.is_empty() {
        args.push(output);
    }
    args
}

/// Reads an image file into a [`PickedImage`].
///
/// # Errors
///
/// Returns [`FoodVisionError::Io`] if the file cannot be read.
pub async fn read_picked_image(path: &Path) -> Result<PickedImage> {
    let bytes = tokio::fs::read(path).await.map_err(FoodVisionError::Io)?;
    let name = path.file_name().map(|n| n.to_string_lossy().to_string());
    let mime_type = detect_mime_type(&bytes, path);
    Ok(PickedImage {
        uri: path.to_path_buf(),
        mime_type,
        file_name: upload_file_name(name.as_deref()),
        bytes: Bytes::from(bytes),
    })
}

/// MIME type from the content, then the extension, then `image/jpeg`.
pub fn detect_mime_type(bytes: &[u8], path: &Path) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    path.extension()
        .and_then(ImageFormat::from_extension)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

/// Name sent with the upload: `image.jpg` when absent, `.jpg` appended when
/// there is no extension.
pub fn upload_file_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        None | Some("") => DEFAULT_FILE_NAME.to_string(),
        Some(name) if name.contains('.') => name.to_string(),
        Some(name) => format!("{}.jpg", name),
    }
}
