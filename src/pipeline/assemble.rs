//! Assembly: ordered image slots → one multi-page PDF in memory.
//!
//! ## Ordering
//!
//! Pages are ordered by the first run of digits in each slot's name, never by
//! download completion. Names without digits sort after every numbered page;
//! equal numbers fall back to the name, so the order is total and the same
//! slot set always yields the same document.
//!
//! ## Encoding
//!
//! Every page is decoded, flattened to RGB (alpha dropped) and re-encoded as
//! baseline JPEG, then placed as a `DCTDecode` image XObject filling its own
//! page. The page box is the image size at 72 DPI, one pixel per point.
//! Decoding and encoding are CPU-bound, so the whole step runs in
//! `spawn_blocking`.

use crate::error::{Embed2PdfError, PageError};
use crate::pipeline::scratch::ImageSlot;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// File extensions the assembler accepts, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp"];

/// The finished document plus the slots that could not be used.
#[derive(Debug)]
pub struct Assembled {
    pub pdf: Vec<u8>,
    pub pages: usize,
    /// Slots dropped for an unrecognised type or undecodable content.
    pub dropped: Vec<PageError>,
}

/// First run of ASCII digits in `name`.
pub fn embedded_number(name: &str) -> Option<u64> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = &name[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// Whether `name` ends in a recognised image extension.
pub fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn page_order(a: &ImageSlot, b: &ImageSlot) -> Ordering {
    match (embedded_number(&a.name), embedded_number(&b.name)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name.cmp(&b.name))
}

/// Keep recognised images and put them in page order.
///
/// Returns the ordered pages and one [`PageError`] per rejected slot.
pub fn order_slots(slots: Vec<ImageSlot>) -> (Vec<ImageSlot>, Vec<PageError>) {
    let (mut pages, rejected): (Vec<_>, Vec<_>) =
        slots.into_iter().partition(|s| is_image_name(&s.name));

    let rejected = rejected
        .into_iter()
        .map(|s| PageError::DecodeFailed {
            seq: s.seq,
            name: s.name,
            detail: "unrecognised image type".to_string(),
        })
        .collect();

    pages.sort_by(page_order);
    (pages, rejected)
}

/// One page ready to embed.
struct EncodedPage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

fn encode_page(rgb: &RgbImage, quality: u8) -> Result<EncodedPage, image::ImageError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(rgb)?;
    Ok(EncodedPage {
        width: rgb.width(),
        height: rgb.height(),
        jpeg,
    })
}

/// Decode every slot to RGB. Undecodable slots become page errors.
fn decode_pages(slots: Vec<ImageSlot>, quality: u8) -> (Vec<EncodedPage>, Vec<PageError>) {
    let mut pages = Vec::with_capacity(slots.len());
    let mut dropped = Vec::new();

    for slot in slots {
        let encoded = image::load_from_memory(&slot.bytes)
            .map(|img| img.to_rgb8())
            .and_then(|rgb| encode_page(&rgb, quality));
        match encoded {
            Ok(page) => {
                debug!("{} → {}x{} px", slot.name, page.width, page.height);
                pages.push(page);
            }
            Err(e) => {
                warn!("Dropping {}: {}", slot.name, e);
                dropped.push(PageError::DecodeFailed {
                    seq: slot.seq,
                    name: slot.name,
                    detail: e.to_string(),
                });
            }
        }
    }

    (pages, dropped)
}

/// Lay the pages out as one PDF document.
fn write_pdf(pages: Vec<EncodedPage>, title: &str) -> Result<Vec<u8>, Embed2PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_count = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(page_count);

    for page in pages {
        let (w, h) = (page.width as i64, page.height as i64);

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w,
                "Height" => h,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            page.jpeg,
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| Embed2PdfError::EncodeFailed(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal(concat!("embed2pdf ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| Embed2PdfError::EncodeFailed(e.to_string()))?;
    Ok(buf)
}

/// Order, decode and encode `slots` into a PDF titled `identifier`.
///
/// Fails with [`Embed2PdfError::NoPagesRecovered`] when nothing decodable
/// remains; `discovered` is only used for that error's message.
pub fn assemble_blocking(
    slots: Vec<ImageSlot>,
    identifier: &str,
    discovered: usize,
    quality: u8,
) -> Result<Assembled, Embed2PdfError> {
    let (ordered, mut dropped) = order_slots(slots);
    let (pages, undecodable) = decode_pages(ordered, quality);
    dropped.extend(undecodable);
    dropped.sort_by_key(PageError::seq);

    if pages.is_empty() {
        return Err(Embed2PdfError::NoPagesRecovered {
            identifier: identifier.to_string(),
            discovered,
        });
    }

    let page_count = pages.len();
    let pdf = write_pdf(pages, identifier)?;
    info!("Assembled {} pages → {} bytes", page_count, pdf.len());

    Ok(Assembled {
        pdf,
        pages: page_count,
        dropped,
    })
}

/// Async wrapper running [`assemble_blocking`] on the blocking pool.
pub async fn assemble(
    slots: Vec<ImageSlot>,
    identifier: &str,
    discovered: usize,
    quality: u8,
) -> Result<Assembled, Embed2PdfError> {
    let identifier = identifier.to_string();
    tokio::task::spawn_blocking(move || assemble_blocking(slots, &identifier, discovered, quality))
        .await
        .map_err(|e| Embed2PdfError::Internal(format!("Assembly task panicked: {}", e)))?
}
