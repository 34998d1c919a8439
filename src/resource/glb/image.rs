use crate::error::{LoadError, LoadResult};
use crate::resource::glb::container::GlbDocument;

/// RGBA8 pixels decoded from an embedded image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Copies the encoded bytes of image `image_index` out of the document along with its format.
///
/// The copy lets decoding run without holding the document.
pub fn read_encoded_image(
    document: &GlbDocument,
    image_index: usize,
) -> LoadResult<(Vec<u8>, image::ImageFormat)> {
    let image = document.gltf.image(image_index)?;

    if let Some(uri) = &image.uri {
        return Err(LoadError::NotSupported(format!(
            "Images referenced by URI are not supported: {}",
            if uri.starts_with("data:") { "<DATA URI>" } else { uri }
        )));
    }

    let view_index = image.buffer_view.ok_or_else(|| {
        LoadError::InvalidGlb(format!(
            "Image {image_index} has neither a URI nor a buffer view"
        ))
    })?;

    let mime_type = image.mime_type.as_deref().ok_or_else(|| {
        LoadError::InvalidGlb(format!(
            "Image {image_index} is stored in a buffer view but has no MIME type"
        ))
    })?;

    let format = image_format(mime_type)?;
    let data = document.buffer_view_data(view_index)?;

    Ok((data.to_vec(), format))
}

/// Maps a glTF image MIME type onto a decoder.
pub fn image_format(mime_type: &str) -> LoadResult<image::ImageFormat> {
    match mime_type {
        "image/png" => Ok(image::ImageFormat::Png),
        "image/jpeg" => Ok(image::ImageFormat::Jpeg),
        _ => Err(LoadError::NotSupported(format!(
            "The given MIME type is not supported: {mime_type}"
        ))),
    }
}

pub fn decode_image(data: &[u8], format: image::ImageFormat) -> LoadResult<DecodedImage> {
    let loaded_image = image::load_from_memory_with_format(data, format)?.to_rgba8();
    let (width, height) = loaded_image.dimensions();

    Ok(DecodedImage {
        width,
        height,
        rgba: loaded_image.into_raw(),
    })
}
