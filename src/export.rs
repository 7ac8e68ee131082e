use crate::config::RenderConfig;
use crate::error::ExportError;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Rasterises a chart svg. The output is `scale` times the svg's own size.
#[cfg(feature = "png")]
pub fn export_png(svg: &str, render_cfg: &RenderConfig) -> Result<Vec<u8>, ExportError> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|err| ExportError::Parse(err.to_string()))?;
    let scale = render_cfg.scale.max(0.1);
    let size = tree.size().to_int_size();
    let width = ((size.width() as f32) * scale).ceil() as u32;
    let height = ((size.height() as f32) * scale).ceil() as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or(ExportError::Allocation { width, height })?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    pixmap
        .encode_png()
        .map_err(|err| ExportError::Encode(err.to_string()))
}

#[cfg(not(feature = "png"))]
pub fn export_png(_svg: &str, _render_cfg: &RenderConfig) -> Result<Vec<u8>, ExportError> {
    Err(ExportError::Disabled("png"))
}

/// Converts a chart svg into a single-page PDF sized to the chart.
#[cfg(feature = "pdf")]
pub fn export_pdf(svg: &str, _render_cfg: &RenderConfig) -> Result<Vec<u8>, ExportError> {
    use svg2pdf::usvg as pdf_usvg;

    let mut opt = pdf_usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree =
        pdf_usvg::Tree::from_str(svg, &opt).map_err(|err| ExportError::Parse(err.to_string()))?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|err| ExportError::Pdf(format!("{err:?}")))
}

#[cfg(not(feature = "pdf"))]
pub fn export_pdf(_svg: &str, _render_cfg: &RenderConfig) -> Result<Vec<u8>, ExportError> {
    Err(ExportError::Disabled("pdf"))
}

pub fn export(svg: &str, format: ExportFormat, render_cfg: &RenderConfig) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Png => export_png(svg, render_cfg),
        ExportFormat::Pdf => export_pdf(svg, render_cfg),
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<(), ExportError> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

pub fn write_export(
    svg: &str,
    format: ExportFormat,
    output: &Path,
    render_cfg: &RenderConfig,
) -> Result<(), ExportError> {
    let bytes = export(svg, format, render_cfg)?;
    std::fs::write(output, bytes)?;
    Ok(())
}
