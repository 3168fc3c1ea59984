//! Multi-asset containers: thumbnail disambiguation and action grouping.

use crate::dom::{Document, NodeId};
use crate::media::ContentLabel;
use crate::resolve::strategies::ResolveContext;
use crate::resolve::{resolve, ResolvedUrl};

/// Images this close to a video container are treated as its preview.
pub const THUMBNAIL_PROXIMITY: f64 = 100.0;

/// URL fragments that mark an image as a preview.
const THUMBNAIL_MARKERS: &[&str] = &["thumb", "preview", "small"];

/// What a single injected control downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSpec {
    pub label: ContentLabel,
    pub assets: Vec<ResolvedUrl>,
}

/// Resolve every downloadable asset in a container.
///
/// Videos are resolved through their player shells; standalone images are
/// resolved individually unless they look like a video's preview.
pub fn resolve_container(ctx: &ResolveContext<'_>) -> Vec<ResolvedUrl> {
    let doc = ctx.doc;
    let mut subtree = vec![ctx.container];
    subtree.extend(doc.descendants(ctx.container));

    let mut video_containers: Vec<NodeId> = Vec::new();
    for video in subtree.iter().copied().filter(|n| doc.tag(*n) == "video") {
        let shell = player_shell(ctx, video);
        if !video_containers.contains(&shell) {
            video_containers.push(shell);
        }
    }

    let images: Vec<NodeId> = subtree
        .iter()
        .copied()
        .filter(|n| doc.tag(*n) == "img")
        .filter(|n| {
            !video_containers
                .iter()
                .any(|vc| *vc == *n || doc.is_ancestor_of(*vc, *n))
        })
        .collect();

    let mut out: Vec<ResolvedUrl> = Vec::new();
    let mut push = |resolved: Option<ResolvedUrl>| {
        if let Some(r) = resolved {
            if !out.contains(&r) {
                out.push(r);
            }
        }
    };

    for vc in &video_containers {
        push(resolve(&ctx.narrowed(*vc)));
    }
    for img in &images {
        if !video_containers.is_empty() && is_video_thumbnail(doc, *img, &video_containers) {
            tracing::debug!("Skipping {:?} as a video preview", img);
            continue;
        }
        push(resolve(&ctx.narrowed(*img)));
    }
    if video_containers.is_empty() && images.is_empty() {
        push(resolve(ctx));
    }

    out
}

/// The player shell of a video: the nearest declared video container inside
/// the resolution root, else the video's parent.
fn player_shell(ctx: &ResolveContext<'_>, video: NodeId) -> NodeId {
    let doc = ctx.doc;
    let inside = |n: NodeId| n == ctx.container || doc.is_ancestor_of(ctx.container, n);

    doc.closest(video, |n| inside(n) && ctx.markup.is_video_container(doc, n))
        .or_else(|| doc.parent(video).filter(|p| inside(*p)))
        .unwrap_or(video)
}

/// Whether an image is the preview of one of the given video containers.
pub fn is_video_thumbnail(doc: &Document, image: NodeId, video_containers: &[NodeId]) -> bool {
    let url = doc
        .attr(image, "src")
        .or_else(|| doc.attr(image, "data-src"))
        .unwrap_or("");
    if THUMBNAIL_MARKERS.iter().any(|m| url.contains(m)) {
        return true;
    }

    let rect = doc.rect(image);
    video_containers
        .iter()
        .any(|vc| rect.distance_to(&doc.rect(*vc)) <= THUMBNAIL_PROXIMITY)
}

/// Group resolved assets into the single action a container offers.
///
/// Several assets of one kind keep that kind's label. Only a mix of videos
/// and images becomes "download all", with the videos first.
pub fn group_action(assets: Vec<ResolvedUrl>) -> Option<ControlSpec> {
    let first = assets.first()?.label;
    if assets.iter().all(|a| a.label == first) {
        return Some(ControlSpec {
            label: first,
            assets,
        });
    }

    let (mut videos, images): (Vec<_>, Vec<_>) = assets
        .into_iter()
        .partition(|a| a.label == ContentLabel::DownloadVideo);
    videos.extend(images);
    Some(ControlSpec {
        label: ContentLabel::DownloadAll,
        assets: videos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DefaultMarkup, Rect};
    use crate::media::QualityTier;
    use crate::store::CorrelationStore;

    fn resolved(url: &str, label: ContentLabel) -> ResolvedUrl {
        ResolvedUrl {
            url: url.to_string(),
            label,
        }
    }

    fn mixed_post(doc: &mut Document) -> (NodeId, NodeId, NodeId) {
        let root = doc.root();
        let post = doc.element("div", &[("data-post-id", "1")]);
        let shell = doc.element("div", &[("class", "video-player")]);
        let video = doc.element("video", &[("src", "https://x/v.mp4")]);
        let far_img = doc.element("img", &[("src", "https://x/photo.jpg")]);
        doc.append_child(root, post);
        doc.append_child(post, shell);
        doc.append_child(shell, video);
        doc.append_child(post, far_img);
        doc.set_rect(shell, Rect::new(0.0, 0.0, 400.0, 300.0));
        doc.set_rect(far_img, Rect::new(0.0, 600.0, 400.0, 300.0));
        (post, shell, far_img)
    }

    #[test]
    fn test_mixed_container_keeps_distant_image() {
        let mut doc = Document::new("https://fansly.com/home");
        let store = CorrelationStore::default();
        let (post, _, _) = mixed_post(&mut doc);

        let ctx = ResolveContext {
            doc: &doc,
            container: post,
            store: &store,
            markup: &DefaultMarkup,
            quality: QualityTier::Full,
        };
        let assets = resolve_container(&ctx);
        assert_eq!(
            assets,
            vec![
                resolved("https://x/v.mp4", ContentLabel::DownloadVideo),
                resolved("https://x/photo.jpg", ContentLabel::Download),
            ]
        );
    }

    #[test]
    fn test_nearby_or_named_images_are_thumbnails() {
        let mut doc = Document::new("https://fansly.com/home");
        let store = CorrelationStore::default();
        let (post, _, far_img) = mixed_post(&mut doc);
        let near = doc.element("img", &[("src", "https://x/cover.jpg")]);
        doc.append_child(post, near);
        doc.set_rect(near, Rect::new(0.0, 350.0, 100.0, 100.0));
        doc.set_attribute(far_img, "src", "https://x/thumb_photo.jpg");

        let ctx = ResolveContext {
            doc: &doc,
            container: post,
            store: &store,
            markup: &DefaultMarkup,
            quality: QualityTier::Full,
        };
        let assets = resolve_container(&ctx);
        assert_eq!(
            assets,
            vec![resolved("https://x/v.mp4", ContentLabel::DownloadVideo)]
        );
    }

    #[test]
    fn test_images_only_are_not_disambiguated() {
        let mut doc = Document::new("https://fansly.com/home");
        let store = CorrelationStore::default();
        let root = doc.root();
        let post = doc.element("div", &[("data-post-id", "1")]);
        let a = doc.element("img", &[("src", "https://x/preview_a.jpg")]);
        let b = doc.element("img", &[("src", "https://x/b.jpg")]);
        doc.append_child(root, post);
        doc.append_child(post, a);
        doc.append_child(post, b);

        let ctx = ResolveContext {
            doc: &doc,
            container: post,
            store: &store,
            markup: &DefaultMarkup,
            quality: QualityTier::Full,
        };
        assert_eq!(resolve_container(&ctx).len(), 2);
    }

    #[test]
    fn test_group_action() {
        assert_eq!(group_action(vec![]), None);

        let single = group_action(vec![resolved("v", ContentLabel::DownloadVideo)]).unwrap();
        assert_eq!(single.label, ContentLabel::DownloadVideo);

        let mixed = group_action(vec![
            resolved("i", ContentLabel::Download),
            resolved("v", ContentLabel::DownloadVideo),
        ])
        .unwrap();
        assert_eq!(mixed.label, ContentLabel::DownloadAll);
        assert_eq!(mixed.assets[0].url, "v");
        assert_eq!(mixed.assets[1].url, "i");

        let images = group_action(vec![
            resolved("a", ContentLabel::Download),
            resolved("b", ContentLabel::Download),
        ])
        .unwrap();
        assert_eq!(images.label, ContentLabel::Download);
        assert_eq!(images.assets.len(), 2);

        let videos = group_action(vec![
            resolved("v1", ContentLabel::DownloadVideo),
            resolved("v2", ContentLabel::DownloadVideo),
        ])
        .unwrap();
        assert_eq!(videos.label, ContentLabel::DownloadVideo);
        let urls: Vec<&str> = videos.assets.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["v1", "v2"]);
    }
}
