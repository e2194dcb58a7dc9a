//! A deliberately narrow reader for the Supernote `.note` container.
//!
//! The format is a flat byte stream of length-prefixed blocks addressed by
//! absolute offsets. The last four bytes of the file point at the *footer*
//! metadata block, which in turn addresses everything else: the header, one
//! metadata block per page, and one per keyword/title/link annotation.
//! Metadata blocks are ASCII `<KEY:VALUE>` runs; binary blocks (layer
//! bitmaps) are RATTA_RLE streams decoded by [`decode`].
//!
//! Only what the conversion pipeline consumes is modelled: page bitmaps in
//! order, and the keyword/title/link annotations projected into the
//! rendering context. Everything else in the container is skipped unread.
//!
//! Annotation footer keys embed the 1-based page number in the first four
//! digits of their suffix (`TITLE_0002…` → page 2); we expose page numbers
//! 0-based throughout.

pub mod decode;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

/// Byte prefix every supported `.note` file starts with.
const SIGNATURE_PREFIX: &[u8] = b"noteSN_FILE_VER_";

/// Page dimensions for A5X/A6X-class devices, used when the header does not
/// carry explicit `PAGEWIDTH`/`PAGEHEIGHT` keys.
pub const DEFAULT_PAGE_WIDTH: u32 = 1404;
pub const DEFAULT_PAGE_HEIGHT: u32 = 1872;

/// The container could not be read.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

/// A parsed notebook: ordered page bitmaps plus annotation collections.
#[derive(Debug, Clone)]
pub struct Notebook {
    pub width: u32,
    pub height: u32,
    /// RATTA_RLE streams, one per page, in page order.
    pub pages: Vec<PageBitmap>,
    pub keywords: Vec<Keyword>,
    pub titles: Vec<Title>,
    pub links: Vec<Link>,
}

/// The undecoded main-layer bitmap of one page.
#[derive(Debug, Clone)]
pub struct PageBitmap {
    pub rle: Vec<u8>,
}

/// A user-entered keyword annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    /// 0-based page number.
    pub page_number: usize,
    pub content: String,
}

/// A handwritten title region (H1, H2, … by `level`).
#[derive(Debug, Clone)]
pub struct Title {
    /// 0-based page number.
    pub page_number: usize,
    pub level: u32,
    /// x, y, width, height of the titled region on the page.
    pub rect: (u32, u32, u32, u32),
    /// RATTA_RLE stream of the title region, `rect` sized.
    pub rle: Vec<u8>,
}

/// A link annotation to a page, file, or URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// 0-based page number.
    pub page_number: usize,
    pub link_type: LinkType,
    pub direction: LinkDirection,
    /// Decoded link target (a device path or URL; stored base64 on device).
    pub target: Vec<u8>,
}

/// Link target kind, from the `LINKTYPE` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Page,
    File,
    Web,
    Unknown,
}

impl LinkType {
    fn from_code(code: u32) -> Self {
        match code {
            0 => LinkType::Page,
            1 => LinkType::File,
            2 => LinkType::Web,
            _ => LinkType::Unknown,
        }
    }

    /// Human-readable code used in rendering contexts.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Page => "page",
            LinkType::File => "file",
            LinkType::Web => "web",
            LinkType::Unknown => "unknown",
        }
    }
}

/// Link direction, from the `LINKINOUT` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    Out,
    In,
    Unknown,
}

impl LinkDirection {
    fn from_code(code: u32) -> Self {
        match code {
            0 => LinkDirection::Out,
            1 => LinkDirection::In,
            _ => LinkDirection::Unknown,
        }
    }

    /// Human-readable code used in rendering contexts.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkDirection::Out => "out",
            LinkDirection::In => "in",
            LinkDirection::Unknown => "unknown",
        }
    }
}

impl Notebook {
    /// Parse a `.note` container from its full byte content.
    pub fn parse(data: &[u8]) -> Result<Notebook, ParseError> {
        Parser { data }.parse()
    }
}

// ── Parser internals ─────────────────────────────────────────────────────

/// Ordered key/value pairs of one metadata block. Keys repeat (`PAGE1`,
/// `PAGE2`, `TITLE_…`), so this is a multimap, not a map.
struct Meta(Vec<(String, String)>);

impl Meta {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// All `(key, value)` pairs whose key starts with `prefix`.
    fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.0
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

struct Parser<'a> {
    data: &'a [u8],
}

impl<'a> Parser<'a> {
    fn parse(&self) -> Result<Notebook, ParseError> {
        if !self.data.starts_with(SIGNATURE_PREFIX) {
            return Err(ParseError("missing noteSN_FILE_VER_ signature".into()));
        }
        if self.data.len() < SIGNATURE_PREFIX.len() + 8 + 4 {
            return Err(ParseError("file too short for signature and footer address".into()));
        }

        let footer_addr = u32::from_le_bytes(
            self.data[self.data.len() - 4..].try_into().expect("4 bytes"),
        );
        let footer = self.meta_at(footer_addr, "footer")?;

        let (width, height) = self.page_dimensions(&footer)?;
        let pages = self.parse_pages(&footer)?;
        let keywords = self.parse_keywords(&footer)?;
        let titles = self.parse_titles(&footer)?;
        let links = self.parse_links(&footer)?;

        Ok(Notebook {
            width,
            height,
            pages,
            keywords,
            titles,
            links,
        })
    }

    /// The length-prefixed block at `addr`.
    fn block_at(&self, addr: u32, what: &str) -> Result<&'a [u8], ParseError> {
        let start = addr as usize;
        let Some(len_bytes) = self.data.get(start..start + 4) else {
            return Err(ParseError(format!("{what} address {addr:#x} out of bounds")));
        };
        let len = u32::from_le_bytes(len_bytes.try_into().expect("4 bytes")) as usize;
        self.data
            .get(start + 4..start + 4 + len)
            .ok_or_else(|| ParseError(format!("{what} block at {addr:#x} truncated (len {len})")))
    }

    /// Parse the `<KEY:VALUE>` metadata block at `addr`.
    fn meta_at(&self, addr: u32, what: &str) -> Result<Meta, ParseError> {
        let block = self.block_at(addr, what)?;
        let text = std::str::from_utf8(block)
            .map_err(|_| ParseError(format!("{what} metadata at {addr:#x} is not ASCII")))?;

        let mut pairs = Vec::new();
        let mut rest = text;
        while let Some(open) = rest.find('<') {
            let Some(close) = rest[open..].find('>') else {
                return Err(ParseError(format!("unterminated tag in {what} metadata")));
            };
            let tag = &rest[open + 1..open + close];
            let Some((key, value)) = tag.split_once(':') else {
                return Err(ParseError(format!("tag '<{tag}>' in {what} metadata has no colon")));
            };
            pairs.push((key.to_string(), value.to_string()));
            rest = &rest[open + close + 1..];
        }
        Ok(Meta(pairs))
    }

    fn page_dimensions(&self, footer: &Meta) -> Result<(u32, u32), ParseError> {
        let Some(header_addr) = footer.get_u32("FILE_FEATURE") else {
            return Ok((DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT));
        };
        let header = self.meta_at(header_addr, "header")?;
        Ok((
            header.get_u32("PAGEWIDTH").unwrap_or(DEFAULT_PAGE_WIDTH),
            header.get_u32("PAGEHEIGHT").unwrap_or(DEFAULT_PAGE_HEIGHT),
        ))
    }

    fn parse_pages(&self, footer: &Meta) -> Result<Vec<PageBitmap>, ParseError> {
        // PAGE1, PAGE2, … — collect in numeric order regardless of footer order.
        let mut numbered: Vec<(usize, u32)> = Vec::new();
        for (key, value) in footer.with_prefix("PAGE") {
            let Ok(number) = key["PAGE".len()..].parse::<usize>() else {
                continue; // PAGESTYLE and friends
            };
            let addr = value
                .parse::<u32>()
                .map_err(|_| ParseError(format!("bad address '{value}' for {key}")))?;
            numbered.push((number, addr));
        }
        numbered.sort_unstable_by_key(|(n, _)| *n);

        let mut pages = Vec::with_capacity(numbered.len());
        for (number, addr) in numbered {
            let page_meta = self.meta_at(addr, "page")?;
            let layer_addr = page_meta
                .get_u32("MAINLAYER")
                .ok_or_else(|| ParseError(format!("page {number} has no MAINLAYER")))?;
            let layer_meta = self.meta_at(layer_addr, "layer")?;
            let bitmap_addr = layer_meta
                .get_u32("LAYERBITMAP")
                .ok_or_else(|| ParseError(format!("page {number} layer has no LAYERBITMAP")))?;
            let rle = self.block_at(bitmap_addr, "layer bitmap")?.to_vec();
            pages.push(PageBitmap { rle });
        }
        Ok(pages)
    }

    /// 1-based page number from the first four digits of an annotation key
    /// suffix, exposed 0-based.
    fn page_from_key(key: &str, prefix: &str) -> Result<usize, ParseError> {
        let suffix = &key[prefix.len()..];
        if suffix.len() < 4 || !suffix[..4].bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError(format!("annotation key '{key}' has no page digits")));
        }
        let page: usize = suffix[..4].parse().expect("four digits");
        if page == 0 {
            return Err(ParseError(format!("annotation key '{key}' has page 0")));
        }
        Ok(page - 1)
    }

    fn parse_keywords(&self, footer: &Meta) -> Result<Vec<Keyword>, ParseError> {
        let mut keywords = Vec::new();
        for (key, value) in footer.with_prefix("KEYWORD_") {
            let page_number = Self::page_from_key(key, "KEYWORD_")?;
            let addr = value
                .parse::<u32>()
                .map_err(|_| ParseError(format!("bad address '{value}' for {key}")))?;
            let meta = self.meta_at(addr, "keyword")?;
            let content = meta
                .get("KEYWORD")
                .ok_or_else(|| ParseError(format!("{key} metadata has no KEYWORD")))?
                .to_string();
            keywords.push(Keyword {
                page_number,
                content,
            });
        }
        Ok(keywords)
    }

    fn parse_titles(&self, footer: &Meta) -> Result<Vec<Title>, ParseError> {
        let mut titles = Vec::new();
        for (key, value) in footer.with_prefix("TITLE_") {
            let page_number = Self::page_from_key(key, "TITLE_")?;
            let addr = value
                .parse::<u32>()
                .map_err(|_| ParseError(format!("bad address '{value}' for {key}")))?;
            let meta = self.meta_at(addr, "title")?;

            let rect_str = meta
                .get("TITLERECT")
                .ok_or_else(|| ParseError(format!("{key} metadata has no TITLERECT")))?;
            let parts: Vec<u32> = rect_str
                .split(',')
                .map(|p| p.trim().parse::<u32>())
                .collect::<Result<_, _>>()
                .map_err(|_| ParseError(format!("bad TITLERECT '{rect_str}'")))?;
            let &[x, y, w, h] = parts.as_slice() else {
                return Err(ParseError(format!("TITLERECT '{rect_str}' is not x,y,w,h")));
            };

            let bitmap_addr = meta
                .get_u32("TITLEBITMAP")
                .ok_or_else(|| ParseError(format!("{key} metadata has no TITLEBITMAP")))?;
            let rle = self.block_at(bitmap_addr, "title bitmap")?.to_vec();

            titles.push(Title {
                page_number,
                level: meta.get_u32("TITLELEVEL").unwrap_or(1),
                rect: (x, y, w, h),
                rle,
            });
        }
        Ok(titles)
    }

    fn parse_links(&self, footer: &Meta) -> Result<Vec<Link>, ParseError> {
        // LINKO_ are outgoing, LINKI_ incoming; both shapes are identical
        // and LINKINOUT inside the metadata is authoritative.
        let mut links = Vec::new();
        for prefix in ["LINKO_", "LINKI_"] {
            for (key, value) in footer.with_prefix(prefix) {
                let page_number = Self::page_from_key(key, prefix)?;
                let addr = value
                    .parse::<u32>()
                    .map_err(|_| ParseError(format!("bad address '{value}' for {key}")))?;
                let meta = self.meta_at(addr, "link")?;

                let target_b64 = meta
                    .get("LINKFILE")
                    .ok_or_else(|| ParseError(format!("{key} metadata has no LINKFILE")))?;
                let target = BASE64
                    .decode(target_b64)
                    .map_err(|e| ParseError(format!("{key} LINKFILE is not base64: {e}")))?;

                links.push(Link {
                    page_number,
                    link_type: LinkType::from_code(meta.get_u32("LINKTYPE").unwrap_or(u32::MAX)),
                    direction: LinkDirection::from_code(
                        meta.get_u32("LINKINOUT").unwrap_or(u32::MAX),
                    ),
                    target,
                });
            }
        }
        Ok(links)
    }
}

// ── Test-only container builder ──────────────────────────────────────────

/// Builds minimal, well-formed `.note` byte streams for tests.
#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    pub struct NoteBuilder {
        data: Vec<u8>,
        footer_tags: Vec<(String, u32)>,
        width: u32,
        height: u32,
    }

    impl NoteBuilder {
        pub fn new(width: u32, height: u32) -> Self {
            let mut data = Vec::new();
            data.extend_from_slice(SIGNATURE_PREFIX);
            data.extend_from_slice(b"20230015");
            NoteBuilder {
                data,
                footer_tags: Vec::new(),
                width,
                height,
            }
        }

        fn push_block(&mut self, content: &[u8]) -> u32 {
            let addr = self.data.len() as u32;
            self.data
                .extend_from_slice(&(content.len() as u32).to_le_bytes());
            self.data.extend_from_slice(content);
            addr
        }

        fn push_meta(&mut self, pairs: &[(&str, String)]) -> u32 {
            let text: String = pairs
                .iter()
                .map(|(k, v)| format!("<{k}:{v}>"))
                .collect();
            self.push_block(text.as_bytes())
        }

        /// Add a page whose main layer holds `rle`.
        pub fn page(&mut self, rle: &[u8]) -> &mut Self {
            let bitmap_addr = self.push_block(rle);
            let layer_addr = self.push_meta(&[("LAYERBITMAP", bitmap_addr.to_string())]);
            let page_addr = self.push_meta(&[("MAINLAYER", layer_addr.to_string())]);
            let number = self
                .footer_tags
                .iter()
                .filter(|(k, _)| k.starts_with("PAGE"))
                .count()
                + 1;
            self.footer_tags.push((format!("PAGE{number}"), page_addr));
            self
        }

        /// Add a keyword annotation on 1-based `page`.
        pub fn keyword(&mut self, page: usize, content: &str) -> &mut Self {
            let addr = self.push_meta(&[("KEYWORD", content.to_string())]);
            self.footer_tags
                .push((format!("KEYWORD_{page:04}01"), addr));
            self
        }

        /// Add a title annotation on 1-based `page`.
        pub fn title(&mut self, page: usize, level: u32, rect: (u32, u32, u32, u32), rle: &[u8]) -> &mut Self {
            let bitmap_addr = self.push_block(rle);
            let (x, y, w, h) = rect;
            let addr = self.push_meta(&[
                ("TITLELEVEL", level.to_string()),
                ("TITLERECT", format!("{x},{y},{w},{h}")),
                ("TITLEBITMAP", bitmap_addr.to_string()),
            ]);
            self.footer_tags.push((format!("TITLE_{page:04}01"), addr));
            self
        }

        /// Add an outgoing link annotation on 1-based `page`.
        pub fn link(&mut self, page: usize, link_type: u32, inout: u32, target: &[u8]) -> &mut Self {
            let addr = self.push_meta(&[
                ("LINKTYPE", link_type.to_string()),
                ("LINKINOUT", inout.to_string()),
                ("LINKFILE", BASE64.encode(target)),
            ]);
            self.footer_tags.push((format!("LINKO_{page:04}01"), addr));
            self
        }

        pub fn build(&mut self) -> Vec<u8> {
            let header_addr = self.push_meta(&[
                ("PAGEWIDTH", self.width.to_string()),
                ("PAGEHEIGHT", self.height.to_string()),
            ]);
            let mut tags = vec![("FILE_FEATURE".to_string(), header_addr)];
            tags.append(&mut self.footer_tags);
            let pairs: Vec<(&str, String)> = tags
                .iter()
                .map(|(k, v)| (k.as_str(), v.to_string()))
                .collect();
            let footer_addr = self.push_meta(&pairs);
            let mut out = self.data.clone();
            out.extend_from_slice(&footer_addr.to_le_bytes());
            out
        }
    }
}
