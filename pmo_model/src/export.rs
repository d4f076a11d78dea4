//! Equipment archives combining a model, skeleton, and textures.
use log::{info, warn};
use pmo_lib::{helmet::HelmetData, pac::Pac, tmh::Tmh, Version};
use rayon::prelude::*;

use crate::{
    error::ExportPacError, skeleton::Skeleton, texture::ImageTexture, ModelRoot, PmoOptions,
};

/// Settings for converting images in [export_pac].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct TextureOptions {
    /// Use 8 bits per channel for palettes with more than 16 colors.
    pub prioritize_color_count: bool,
}

/// Create a `.pac` archive with entries for the model, skeleton, and texture container.
///
/// Images are selected from `images` by the names used by [MaterialTexture::Image](crate::MaterialTexture::Image)
/// in the order they first appear in the model materials.
/// The `helmet` data is only written for [Version::P3rd].
#[tracing::instrument(skip_all)]
pub fn export_pac(
    model: &ModelRoot,
    skeleton: &Skeleton,
    images: &[ImageTexture],
    options: &PmoOptions,
    texture_options: &TextureOptions,
    helmet: Option<HelmetData>,
) -> Result<Pac, ExportPacError> {
    let pmo = model.to_pmo(options)?;
    let ahi = skeleton.to_ahi(options.version)?;

    let used_images = model
        .image_names()
        .into_iter()
        .map(|name| {
            images
                .iter()
                .find(|i| i.name == name)
                .ok_or(ExportPacError::MissingImage { name })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let gims = used_images
        .par_iter()
        .map(|i| i.to_gim(texture_options.prioritize_color_count))
        .collect::<Result<Vec<_>, _>>()?;
    let tmh = Tmh::new(gims);

    let mut entries = vec![
        entry("model", pmo.to_bytes())?,
        entry("skeleton", ahi.to_bytes())?,
        entry("texture", tmh.to_bytes())?,
    ];

    match (helmet, options.version) {
        (Some(helmet), Version::P3rd) => entries.push(entry("helmet", helmet.to_bytes())?),
        (Some(_), Version::Fu) => warn!("Helmet data is not supported for Freedom Unite."),
        (None, _) => (),
    }

    info!(
        "Exported {} submeshes, {} bones, and {} images",
        pmo.tristrip_headers.len(),
        ahi.bones.len(),
        tmh.images.len()
    );

    Ok(Pac { entries })
}

fn entry(
    entry: &'static str,
    result: Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>,
) -> Result<Vec<u8>, ExportPacError> {
    result.map_err(|source| ExportPacError::Write { entry, source })
}
