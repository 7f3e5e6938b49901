use actix_multipart::Field;
use actix_web::{error, Error};
use anyhow::Context;
use futures::StreamExt;
use once_cell::sync::OnceCell;
use std::path::Path;

static DIR_UGC: OnceCell<String> = OnceCell::new();

#[inline(always)]
pub fn get_dir_ugc() -> &'static str {
    unsafe { DIR_UGC.get_unchecked() }
}

pub fn init() {
    let dir = std::env::var("DIR_UGC")
        .expect("missing DIR_UGC environment variable (hint: 'DIR_UGC=./ugc')");
    let path = Path::new(&dir);
    if !path.exists() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .create(path)
            .expect("failed to create DIR_UGC");
    }
    DIR_UGC.set(dir).expect("failed to set DIR_UGC");
}

pub struct UploadPayload {
    pub data: Vec<u8>,
    pub filename: String,
    pub hash: blake3::Hash,
    pub extension: &'static str,
}

fn extension_for_mime(mime: &mime::Mime) -> Option<&'static str> {
    if mime.type_() != mime::IMAGE {
        return None;
    }
    match mime.subtype().as_str() {
        "png" => Some("png"),
        "jpeg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        _ => None,
    }
}

/// Buffers an uploaded image field, hashing as it streams in.
/// Returns None for an empty file input (browsers submit one with no filename).
pub async fn read_image_field(field: &mut Field) -> Result<Option<UploadPayload>, Error> {
    let filename = field
        .content_disposition()
        .get_filename()
        .unwrap_or("")
        .to_owned();
    if filename.is_empty() {
        return Ok(None);
    }

    let extension = extension_for_mime(field.content_type())
        .ok_or_else(|| error::ErrorBadRequest("Images must be png, jpg, gif, or webp."))?;

    let mut hasher = blake3::Hasher::new();
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    while let Some(chunk) = field.next().await {
        let bytes = chunk.map_err(|e| {
            log::error!("read_image_field: multipart read error: {}", e);
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
        extension,
    }))
}

/// Writes the payload under its content hash and returns the stored name.
/// A hash collision with an existing file is a duplicate upload, not an error.
pub fn persist(payload: &UploadPayload) -> anyhow::Result<String> {
    let name = format!("{}.{}", payload.hash, payload.extension);
    let path = Path::new(get_dir_ugc()).join(&name);
    if path.exists() {
        log::info!("persist: duplicate upload of {}, skipping write", name);
    } else {
        std::fs::write(&path, &payload.data)
            .with_context(|| format!("writing upload to {}", path.display()))?;
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_mimes_map_to_extensions() {
        assert_eq!(extension_for_mime(&mime::IMAGE_PNG), Some("png"));
        assert_eq!(extension_for_mime(&mime::IMAGE_JPEG), Some("jpg"));
        assert_eq!(extension_for_mime(&mime::IMAGE_GIF), Some("gif"));
    }

    #[test]
    fn non_images_are_rejected() {
        assert_eq!(extension_for_mime(&mime::TEXT_HTML), None);
        assert_eq!(extension_for_mime(&mime::APPLICATION_OCTET_STREAM), None);
        // Unhandled image subtypes are rejected rather than stored blind.
        let tiff: mime::Mime = "image/tiff".parse().unwrap();
        assert_eq!(extension_for_mime(&tiff), None);
    }
}
