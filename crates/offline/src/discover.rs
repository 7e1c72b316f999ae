//! Image discovery over entry HTML.
//!
//! Scans raw entry content for `<img>` tags and plans a local filename for
//! each distinct remote image. Anything that cannot be turned into a
//! fetchable absolute URL (inline `data:` payloads, relative paths without
//! a usable base, empty `src`) is skipped; a broken tag never aborts
//! discovery of the rest.

use crate::consts;
use regex::Regex;
use std::collections::HashMap;
use tracing::{instrument, trace};
use url::Url;

/// One image referenced by entry content.
///
/// `downloaded` and `failure` start out unset; the download workflow fills
/// them in as it works through the plan.
#[derive(Debug, Clone)]
pub struct ImageRef {
    /// Normalized absolute URL the image will be fetched from.
    pub src: String,
    /// Local filename inside the entry directory, `image_NNN.ext`.
    pub filename: String,
    /// Declared width attribute, when present and numeric.
    pub width: Option<u32>,
    /// Declared height attribute, when present and numeric.
    pub height: Option<u32>,
    /// Whether the file made it to disk.
    pub downloaded: bool,
    /// Human-readable reason the fetch failed, when it did.
    pub failure: Option<String>,
}

/// Ordered discovery results with a lookup index by normalized URL.
#[derive(Debug, Default)]
pub struct Discovery {
    images: Vec<ImageRef>,
    index: HashMap<String, usize>,
}

impl Discovery {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut [ImageRef] {
        &mut self.images
    }

    /// Look up an image by its normalized URL.
    pub fn get(&self, src: &str) -> Option<&ImageRef> {
        self.index.get(src).map(|&position| &self.images[position])
    }

    pub fn downloaded_count(&self) -> usize {
        self.images.iter().filter(|image| image.downloaded).count()
    }

    pub fn failed_count(&self) -> usize {
        self.images.iter().filter(|image| image.failure.is_some()).count()
    }

    fn push(&mut self, src: String, width: Option<u32>, height: Option<u32>) {
        let filename = format!("image_{:03}.{}", self.images.len() + 1, extension_for(&src));
        self.index.insert(src.clone(), self.images.len());
        self.images.push(ImageRef { src, filename, width, height, downloaded: false, failure: None });
    }
}

/// Scan `html` for images worth downloading.
///
/// Numbering follows document order and the first occurrence of a URL wins;
/// later duplicates share its [`ImageRef`]. Relative URLs resolve against
/// `base` (normally the entry's own link) and are skipped without one.
#[instrument(skip(html, base), fields(html_size = html.len()))]
pub fn discover(html: &str, base: Option<&Url>) -> Discovery {
    let mut found = Discovery::default();
    for tag in consts::IMG_TAG_REGEX.find_iter(html) {
        let tag = tag.as_str();
        let Some(raw) = src_attr(tag) else {
            trace!(tag, "img tag without usable src");
            continue;
        };
        let Some(src) = normalize_src(&raw, base) else {
            trace!(src = raw, "skipping unfetchable image URL");
            continue;
        };
        if found.index.contains_key(&src) {
            continue;
        }
        let width = dimension(tag, &consts::WIDTH_ATTR_REGEX);
        let height = dimension(tag, &consts::HEIGHT_ATTR_REGEX);
        found.push(src, width, height);
    }
    found
}

/// Pull the `src` attribute value out of a raw `<img>` tag.
pub(crate) fn src_attr(tag: &str) -> Option<String> {
    let captures = consts::SRC_ATTR_REGEX.captures(tag)?;
    let value = captures.get(1).or_else(|| captures.get(2)).or_else(|| captures.get(3))?;
    let value = value.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Turn a raw `src` value into the absolute URL it would be fetched from.
///
/// Returns `None` for anything that is not an HTTP(S) resource: inline
/// `data:` payloads, `javascript:` and friends, and relative paths when no
/// base is available. Protocol-relative URLs are pinned to HTTPS.
pub(crate) fn normalize_src(src: &str, base: Option<&Url>) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    if let Some(rest) = src.strip_prefix("//") {
        let url = Url::parse(&format!("https://{rest}")).ok()?;
        return Some(url.to_string());
    }
    match Url::parse(src) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url.to_string()),
        // data:, javascript:, mailto:, ftp:... nothing we can save to disk.
        Ok(_) => None,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let url = base?.join(src).ok()?;
            matches!(url.scheme(), "http" | "https").then(|| url.to_string())
        }
        Err(_) => None,
    }
}

/// Choose the on-disk extension for an image URL.
///
/// The extension is taken from the URL path (query and fragment never
/// count), lowercased, and kept only when it is a format e-readers can
/// open. Everything else falls back to `jpg`; a wrong extension still
/// renders, a missing one does not.
pub(crate) fn extension_for(src: &str) -> &'static str {
    let path = match Url::parse(src) {
        Ok(url) => url.path().to_string(),
        Err(_) => src.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let Some((_, ext)) = path.rsplit_once('.') else {
        return consts::DEFAULT_EXTENSION;
    };
    let ext = ext.to_ascii_lowercase();
    consts::IMAGE_EXTENSIONS
        .iter()
        .find(|known| **known == ext)
        .copied()
        .unwrap_or(consts::DEFAULT_EXTENSION)
}

/// Parse a `width`/`height` attribute as a pixel count.
///
/// The value feeds a `px` inline style, so only whole numbers qualify;
/// relative values like `100%` or `auto` yield `None`.
fn dimension(tag: &str, pattern: &Regex) -> Option<u32> {
    let captures = pattern.captures(tag)?;
    let value = captures.get(1).or_else(|| captures.get(2)).or_else(|| captures.get(3))?;
    value.as_str().trim().parse().ok()
}
