//! Raster export of rendered diagrams.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid PNG scale: {0}")]
    InvalidScale(f32),
    #[error("Failed to parse SVG: {0}")]
    Parse(String),
    #[error("Failed to create a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
}

/// Rasterize an SVG document. `scale` multiplies the document size.
#[cfg(feature = "png")]
pub fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>, ExportError> {
    use resvg::tiny_skia::{Pixmap, Transform};
    use resvg::usvg;

    if !scale.is_finite() || scale <= 0.0 {
        return Err(ExportError::InvalidScale(scale));
    }

    let mut opts = usvg::Options::default();
    opts.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opts).map_err(|e| ExportError::Parse(e.to_string()))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;
    tracing::debug!(width, height, scale, "rasterizing diagram");

    let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::Pixmap { width, height })?;
    // Opaque background; diagrams are exported for documents.
    pixmap.fill(resvg::tiny_skia::Color::WHITE);
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| ExportError::Encode(e.to_string()))
}
