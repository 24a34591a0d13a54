use actix_multipart::Field;
use actix_web::{error, Error};
use futures::StreamExt;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

static DIR_MEDIA: OnceCell<String> = OnceCell::new();

#[inline(always)]
pub fn get_media_dir() -> &'static str {
    DIR_MEDIA.get().expect("filesystem::init() has not run")
}

pub fn init() {
    let dir = std::env::var("DIR_MEDIA")
        .expect("missing DIR_MEDIA environment variable (hint: 'DIR_MEDIA=./media')");
    let path = Path::new(&dir);
    if !path.exists() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .create(path)
            .expect("failed to create DIR_MEDIA");
    }
    DIR_MEDIA.set(dir).expect("failed to set DIR_MEDIA");
}

pub struct UploadPayload {
    pub data: Vec<u8>,
    pub filename: String,
    pub hash: blake3::Hash,
}

pub fn is_image_field(field: &Field) -> bool {
    field.content_type().type_() == mime::IMAGE
}

/// Drains a multipart field into memory, hashing as it goes.
/// Returns None for fields with no filename or no content.
pub async fn read_field_as_payload(field: &mut Field) -> Result<Option<UploadPayload>, Error> {
    let filename = match field.content_disposition().get_filename() {
        Some(filename) if !filename.is_empty() => filename.to_owned(),
        _ => return Ok(None),
    };

    let mut hasher = blake3::Hasher::new();
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    while let Some(chunk) = field.next().await {
        let bytes = chunk.map_err(|e| {
            log::error!("read_field_as_payload: multipart read error: {}", e);
            error::ErrorInternalServerError("error reading upload data")
        })?;
        hasher.update(&bytes);
        buf.extend(bytes);
    }

    if buf.is_empty() {
        return Ok(None);
    }

    Ok(Some(UploadPayload {
        data: buf,
        filename,
        hash: hasher.finalize(),
    }))
}

/// Stores the payload under its content hash and returns the stored filename.
/// Identical uploads land on the same name, so the write is skipped.
pub fn persist_payload(payload: &UploadPayload) -> Result<String, Error> {
    let ext = Path::new(&payload.filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin")
        .to_ascii_lowercase();
    let stored = format!("{}.{}", payload.hash, ext);

    let dest: PathBuf = [get_media_dir(), &stored].iter().collect();
    if dest.exists() {
        log::info!("persist_payload: duplicate upload, skipping write");
    } else {
        std::fs::write(&dest, &payload.data).map_err(|e| {
            log::error!("persist_payload: {}", e);
            error::ErrorInternalServerError("failed to store file")
        })?;
    }

    Ok(stored)
}
