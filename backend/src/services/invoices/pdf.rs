//! PDF export adapter.
//!
//! Renders an invoice payload to PDF bytes with `genpdf`. Both template
//! layouts are matched exhaustively; a payload can never be rendered under
//! the wrong template. The company logo, stored as a base64 data URL, is
//! rescaled, flattened over white and embedded via a temporary PNG.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use genpdf::elements::{Break, Image as PdfImage, LinearLayout, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::Document;
use image::imageops::FilterType;
use image::{load_from_memory, DynamicImage, GenericImageView};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use tempfile::NamedTempFile;

use common::model::invoice::{ClassicInvoice, InvoicePayload, ModernInvoice};

const IMAGE_DPI: f64 = 150.0;
// The editor shows the logo in a 200x200 CSS-pixel box; the PDF honours the
// same limit at 96 CSS px per inch.
const LOGO_MAX_CSS_PX: f64 = 200.0;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("font setup failed: {0}")]
    Fonts(String),
    #[error("pdf rendering failed: {0}")]
    Pdf(String),
    #[error("logo could not be embedded: {0}")]
    Logo(String),
}

/// Rasterizes an invoice payload into a PDF artifact. Failure here is fatal
/// to the export attempt that requested it; nothing is persisted.
pub trait PdfExporter {
    fn render(
        &self,
        payload: &InvoicePayload,
        logo_url: Option<&str>,
    ) -> Result<Vec<u8>, RenderError>;
}

pub struct GenpdfExporter {
    fonts_dir: PathBuf,
}

impl GenpdfExporter {
    pub fn new<P: AsRef<Path>>(fonts_dir: P) -> GenpdfExporter {
        GenpdfExporter {
            fonts_dir: fonts_dir.as_ref().to_path_buf(),
        }
    }

    /// Try Arial first, fall back to LiberationSans in the same directory.
    fn load_font(&self) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, RenderError> {
        if let Ok(family) = genpdf::fonts::from_files(&self.fonts_dir, "Arial", None) {
            return Ok(family);
        }
        genpdf::fonts::from_files(&self.fonts_dir, "LiberationSans", None)
            .map_err(|e| RenderError::Fonts(e.to_string()))
    }

    fn configure_document(&self, title: &str) -> Result<Document, RenderError> {
        let font_family = self.load_font()?;
        let mut doc = Document::new(font_family);
        doc.set_title(title);
        // Approximate the editor preview's 11px body text: 1px = 0.75pt.
        let font_size_pt: u8 = (11.0_f32 * 0.75_f32).round() as u8;
        doc.set_font_size(font_size_pt);
        doc.set_line_spacing(1.0);
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);
        Ok(doc)
    }
}

impl PdfExporter for GenpdfExporter {
    fn render(
        &self,
        payload: &InvoicePayload,
        logo_url: Option<&str>,
    ) -> Result<Vec<u8>, RenderError> {
        let mut doc = self.configure_document(&format!(
            "Proposal {}",
            payload.proposal_number()
        ))?;

        // Keep temporary files alive until rendering finishes.
        let mut temp_files: Vec<NamedTempFile> = Vec::new();

        if let Some(url) = logo_url {
            embed_logo(&mut doc, url, &mut temp_files)?;
            doc.push(Break::new(1));
        }

        match payload {
            InvoicePayload::Classic(inv) => push_classic(&mut doc, inv),
            InvoicePayload::Modern(inv) => push_modern(&mut doc, inv),
        }

        let mut out = Vec::new();
        doc.render(&mut out)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        Ok(out)
    }
}

fn push_classic(doc: &mut Document, inv: &ClassicInvoice) {
    doc.push(bold_paragraph(&inv.company.name));
    doc.push(Paragraph::new(inv.company.address1.as_str()));
    doc.push(Paragraph::new(inv.company.address2.as_str()));
    doc.push(Paragraph::new(inv.company.phone.as_str()));
    doc.push(Paragraph::new(inv.company.emails.as_str()));
    doc.push(Break::new(1));

    push_labeled(doc, "Proposal #", &inv.client.proposal_num);
    push_labeled(doc, "Date", &inv.client.date);
    push_labeled(doc, "Client", &inv.client.name);
    push_labeled(doc, "Email", &inv.client.email);
    push_labeled(doc, "Property Address", &inv.client.address);
    doc.push(Break::new(1));

    push_section_title(doc, "Scope of Work");
    push_multiline(doc, &inv.scope_of_work);
    doc.push(Break::new(1));

    push_section_title(doc, "Lump Sum Total");
    doc.push(Paragraph::new(format!("$ {}", inv.lump_sum_total)));
    doc.push(Break::new(1));

    push_section_title(doc, "Notes");
    for note in &inv.notes {
        push_bullet_item(doc, note);
    }
    doc.push(Break::new(1));

    push_section_title(doc, "Disclaimer");
    push_multiline(doc, &inv.disclaimer);
    doc.push(Break::new(1));

    push_section_title(doc, "Client Acceptance");
    doc.push(Paragraph::new("Client Signature: ____________________"));
    doc.push(Paragraph::new("Date: ____________________"));
}

fn push_modern(doc: &mut Document, inv: &ModernInvoice) {
    doc.push(bold_paragraph(&inv.company.name));
    doc.push(Paragraph::new(inv.company.address.as_str()));
    doc.push(Paragraph::new(inv.company.email.as_str()));
    doc.push(Paragraph::new(inv.company.phone.as_str()));
    doc.push(Break::new(1));

    push_labeled(doc, "Proposal #", &inv.proposal.number);
    push_labeled(doc, "Date", &inv.proposal.date);
    doc.push(Break::new(1));

    push_section_title(doc, "Client");
    doc.push(Paragraph::new(inv.client.name.as_str()));
    doc.push(Paragraph::new(inv.client.address1.as_str()));
    doc.push(Paragraph::new(inv.client.address2.as_str()));
    push_labeled(doc, "PCN", &inv.client.pcn);
    doc.push(Break::new(1));

    push_section_title(doc, "Project Scope");
    push_multiline(doc, &inv.project_scope);
    doc.push(Break::new(1));

    push_section_title(doc, "Description");
    push_multiline(doc, &inv.description);
    doc.push(Break::new(1));

    push_section_title(doc, "Amount");
    doc.push(Paragraph::new(format!("$ {}", inv.amount)));
    doc.push(Break::new(1));

    push_section_title(doc, "Notes");
    push_multiline(doc, &inv.notes);
}

fn bold_paragraph(text: &str) -> Paragraph {
    let mut p = Paragraph::new("");
    p.push(StyledString::new(text, Style::new().bold()));
    p
}

fn push_section_title(doc: &mut Document, title: &str) {
    doc.push(bold_paragraph(title));
}

fn push_labeled(doc: &mut Document, label: &str, value: &str) {
    let mut p = Paragraph::new("");
    p.push(StyledString::new(format!("{}: ", label), Style::new().bold()));
    p.push(StyledString::new(value, Style::new()));
    doc.push(p);
}

/// Push text that may contain internal newlines, preserving empty lines.
fn push_multiline(doc: &mut Document, text: &str) {
    for line in text.split('\n') {
        if line.is_empty() {
            doc.push(Break::new(1));
        } else {
            doc.push(Paragraph::new(line));
        }
    }
}

fn push_bullet_item(doc: &mut Document, item: &str) {
    let mut p = Paragraph::new("");
    p.push(StyledString::new("• ", Style::new()));
    p.push(StyledString::new(item, Style::new()));
    let mut layout = LinearLayout::vertical();
    layout.push(p);
    doc.push(layout);
}

/// Extracts the raw bytes from a `data:<mime>;base64,<payload>` URL.
/// Returns `None` for anything else (including plain http links, which the
/// renderer does not fetch).
fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    BASE64.decode(payload).ok()
}

/// Rescales the logo to the editor's display limits, flattens any alpha
/// channel over white, writes a temporary PNG and embeds it.
fn embed_logo(
    doc: &mut Document,
    logo_url: &str,
    temp_files: &mut Vec<NamedTempFile>,
) -> Result<(), RenderError> {
    let bytes = match decode_data_url(logo_url) {
        Some(bytes) => bytes,
        // Not a data URL: nothing to embed, the document stays logo-less.
        None => return Ok(()),
    };

    let img = load_from_memory(&bytes).map_err(|e| RenderError::Logo(e.to_string()))?;
    let (orig_w, orig_h) = img.dimensions();
    let orig_w_f = orig_w as f64;
    let orig_h_f = orig_h as f64;

    // Convert CSS px limits to image pixels at IMAGE_DPI (96 CSS px/inch).
    let css_to_px = IMAGE_DPI / 96.0;
    let max_w = LOGO_MAX_CSS_PX * css_to_px;
    let max_h = LOGO_MAX_CSS_PX * css_to_px;
    let scale = (max_w / orig_w_f).min(max_h / orig_h_f).min(1.0);

    let resized: DynamicImage = if scale >= 1.0 {
        img
    } else {
        let new_w = (orig_w_f * scale).max(1.0).round() as u32;
        let new_h = (orig_h_f * scale).max(1.0).round() as u32;
        img.resize(new_w, new_h, FilterType::Lanczos3)
    };

    let rgba = resized.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut background = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &rgba, 0, 0);
    let rgb_image = DynamicImage::ImageRgba8(background).to_rgb8();
    let raw = rgb_image.into_raw();

    let mut tmp = NamedTempFile::new().map_err(|e| RenderError::Logo(e.to_string()))?;
    {
        let file = tmp.as_file_mut();
        let mut encoder = PngEncoder::new(file, w, h);
        encoder.set_color(PngColorType::Rgb);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError::Logo(e.to_string()))?;
        writer
            .write_image_data(&raw)
            .map_err(|e| RenderError::Logo(e.to_string()))?;
    }

    let path: PathBuf = tmp.path().to_path_buf();
    let mut img_elem =
        PdfImage::from_path(path).map_err(|e| RenderError::Logo(e.to_string()))?;
    img_elem.set_dpi(IMAGE_DPI);
    temp_files.push(tmp);
    doc.push(img_elem);
    Ok(())
}
