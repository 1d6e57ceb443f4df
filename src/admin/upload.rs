use crate::admin::form::NewImage;
use crate::backend::{AdminSession, BackendError, BackendResult, ObjectStorage, ObjectUpload};
use chrono::Utc;
use futures::future::try_join_all;
use rand::Rng;
use tracing::{error, info};

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 6;

/// Storage name for an uploaded file: `<unix millis>-<random base36>.<ext>`.
///
/// The original extension is kept; files without one get no extension.
pub fn object_name<R: Rng>(file_name: &str, millis: i64, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{}-{}.{}", millis, suffix, ext.to_lowercase())
        }
        _ => format!("{}-{}", millis, suffix),
    }
}

/// Upload every file concurrently and return their public URLs in the
/// order the files were given.
///
/// The first failure fails the whole batch. Files that were already stored
/// stay in the bucket.
pub async fn upload_images(
    storage: &dyn ObjectStorage,
    images: &[NewImage],
    session: &AdminSession,
) -> BackendResult<Vec<String>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }

    let uploads = images.iter().map(|image| {
        let name = object_name(&image.file_name, Utc::now().timestamp_millis(), &mut rand::rng());
        async move {
            let object = ObjectUpload {
                content_type: image.content_type.clone(),
                bytes: image.bytes.clone(),
            };

            storage.upload(&name, object, session).await.map_err(|e| {
                error!("Upload error for {}: {}", image.file_name, e);
                match e {
                    BackendError::Unauthorized(_) => e,
                    other => BackendError::Storage(format!(
                        "Failed to upload {}: {}",
                        image.file_name,
                        other.message()
                    )),
                }
            })?;

            Ok::<_, BackendError>(storage.public_url(&name))
        }
    });

    let urls = try_join_all(uploads).await?;
    info!("Uploaded {} images", urls.len());
    Ok(urls)
}
