//! Individual URL extraction strategies.
//!
//! Each strategy is a pure function of the resolution context and returns the
//! first URL it can vouch for.

use crate::dom::{Document, Markup, NodeId};
use crate::media::{ContentLabel, MediaKind, QualityTier};
use crate::resolve::ResolvedUrl;
use crate::store::CorrelationStore;

/// Attributes that may carry a URL on lazily rendered players.
pub const DATA_URL_ATTRIBUTES: &[&str] = &["data-src", "data-video", "data-url", "data-source"];

/// Ancestor levels searched for data attributes.
pub const DATA_ATTRIBUTE_DEPTH: usize = 3;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m3u8", "webm", "mov", "m4v"];

/// Everything a strategy may look at.
pub struct ResolveContext<'a> {
    pub doc: &'a Document,
    pub container: NodeId,
    pub store: &'a CorrelationStore,
    pub markup: &'a dyn Markup,
    pub quality: QualityTier,
}

impl<'a> ResolveContext<'a> {
    /// The same context narrowed to another subtree.
    pub fn narrowed(&self, container: NodeId) -> ResolveContext<'a> {
        ResolveContext {
            doc: self.doc,
            container,
            store: self.store,
            markup: self.markup,
            quality: self.quality,
        }
    }

    /// The container and its descendants.
    fn subtree(&self) -> Vec<NodeId> {
        let mut nodes = vec![self.container];
        nodes.extend(self.doc.descendants(self.container));
        nodes
    }

    fn with_tag(&self, tags: &[&str]) -> Vec<NodeId> {
        self.subtree()
            .into_iter()
            .filter(|n| tags.contains(&self.doc.tag(*n)))
            .collect()
    }

    /// The primary media element: the first video, else the first image.
    fn media_element(&self) -> Option<NodeId> {
        self.with_tag(&["video"])
            .into_iter()
            .next()
            .or_else(|| self.with_tag(&["img"]).into_iter().next())
    }

    fn has_video(&self) -> bool {
        !self.with_tag(&["video"]).is_empty()
    }

    fn resolved(&self, url: &str) -> ResolvedUrl {
        let label = if self.has_video() || looks_like_video(url) {
            ContentLabel::DownloadVideo
        } else {
            ContentLabel::Download
        };
        ResolvedUrl {
            url: url.to_string(),
            label,
        }
    }
}

/// URLs the host download service cannot fetch directly.
pub fn is_usable_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && !url.starts_with("blob:") && !url.starts_with("data:")
}

fn looks_like_video(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or("");
    path.rsplit_once('.')
        .map(|(_, ext)| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn usable_attr<'d>(doc: &'d Document, node: NodeId, name: &str) -> Option<&'d str> {
    doc.attr(node, name).map(str::trim).filter(|u| is_usable_url(u))
}

/// 1. A `<source>` explicitly labeled "original".
pub fn original_source(ctx: &ResolveContext<'_>) -> Option<ResolvedUrl> {
    ctx.with_tag(&["source"])
        .into_iter()
        .filter(|n| {
            ["label", "data-label", "data-quality", "title"]
                .iter()
                .filter_map(|a| ctx.doc.attr(*n, a))
                .any(|v| v.eq_ignore_ascii_case("original"))
        })
        .find_map(|n| usable_attr(ctx.doc, n, "src"))
        .map(|url| ctx.resolved(url))
}

/// 2. Any `<source>` element.
pub fn any_source(ctx: &ResolveContext<'_>) -> Option<ResolvedUrl> {
    ctx.with_tag(&["source"])
        .into_iter()
        .find_map(|n| usable_attr(ctx.doc, n, "src"))
        .map(|url| ctx.resolved(url))
}

/// 3. The media element's own `src`.
pub fn direct_src(ctx: &ResolveContext<'_>) -> Option<ResolvedUrl> {
    let media = ctx.media_element()?;
    usable_attr(ctx.doc, media, "src").map(|url| ctx.resolved(url))
}

/// 4. The correlation store: preview fingerprints first, then the declared post id.
pub fn correlation_lookup(ctx: &ResolveContext<'_>) -> Option<ResolvedUrl> {
    let previews = ctx.subtree().into_iter().filter_map(|n| match ctx.doc.tag(n) {
        "video" => ctx.doc.attr(n, "poster"),
        "img" => ctx.doc.attr(n, "src"),
        _ => None,
    });
    for preview in previews {
        if let Some(asset) = ctx.store.asset(preview) {
            if let Some(url) = asset.url_for(ctx.quality) {
                return Some(ResolvedUrl {
                    url: url.to_string(),
                    label: asset.kind().label(),
                });
            }
        }
    }

    let post_id = ctx.markup.post_id(ctx.doc, ctx.container)?;
    let record = ctx.store.post(&post_id)?;
    let wants_video = ctx.has_video();
    record
        .media
        .iter()
        .filter(|a| !wants_video || a.kind() == MediaKind::Video)
        .find_map(|asset| {
            asset.url_for(ctx.quality).map(|url| ResolvedUrl {
                url: url.to_string(),
                label: asset.kind().label(),
            })
        })
}

/// 5. Data attributes on the media element (or container) and up to three ancestors.
pub fn data_attributes(ctx: &ResolveContext<'_>) -> Option<ResolvedUrl> {
    let start = ctx.media_element().unwrap_or(ctx.container);
    std::iter::once(start)
        .chain(ctx.doc.ancestors(start).take(DATA_ATTRIBUTE_DEPTH))
        .find_map(|n| {
            DATA_URL_ATTRIBUTES
                .iter()
                .find_map(|a| usable_attr(ctx.doc, n, a))
        })
        .map(|url| ctx.resolved(url))
}

/// 6. Any nested media or source element with a URL.
pub fn exhaustive_scan(ctx: &ResolveContext<'_>) -> Option<ResolvedUrl> {
    ctx.with_tag(&["video", "source", "img", "audio"])
        .into_iter()
        .find_map(|n| {
            usable_attr(ctx.doc, n, "src").or_else(|| {
                DATA_URL_ATTRIBUTES
                    .iter()
                    .find_map(|a| usable_attr(ctx.doc, n, a))
            })
        })
        .map(|url| ctx.resolved(url))
}
