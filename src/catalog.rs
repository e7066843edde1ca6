use serde::{Deserialize, Serialize};

/// Format catalog construction.
///
/// Turns the raw format descriptors returned by the extraction backend into
/// the labeled list offered to the user, applying the type filter and the
/// playability rule: a video-only stream without audio is never offered,
/// because it is not independently playable without muxing.

/// Sentinel format id meaning "let the extraction backend choose"; combines
/// best video with best audio, falling back to the single best stream.
pub const BEST_FORMAT: &str = "bestvideo+bestaudio/best";

/// One encoding variant of a media item, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub resolution: Option<String>,
    pub has_video: bool,
    pub has_audio: bool,
    pub filesize: Option<u64>,
    pub ext: Option<String>,
}

impl FormatDescriptor {
    /// Independently playable: carries audio, with or without video.
    /// Mirrors the catalog exclusion rule and defines the fallback subset.
    pub fn is_safe(&self) -> bool {
        self.has_audio
    }
}

/// User-selected type filter applied after the playability rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFilter {
    All,
    VideoOnly,
    AudioOnly,
}

/// One selectable catalog row: display label plus the opaque format id the
/// backend understands.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub label: String,
    pub format_id: String,
}

/// Builds the labeled catalog from raw descriptors.
///
/// Video-only descriptors are dropped first regardless of `filter`; the
/// filter then narrows the survivors. Labels read
/// `"{format_id} - {resolution|audio}"` with the size in MB appended when
/// known.
pub fn build_catalog(raw: &[FormatDescriptor], filter: FormatFilter) -> Vec<CatalogEntry> {
    raw.iter()
        .filter(|f| !(f.has_video && !f.has_audio))
        .filter(|f| match filter {
            FormatFilter::All => true,
            FormatFilter::VideoOnly => f.has_video,
            FormatFilter::AudioOnly => !f.has_video && f.has_audio,
        })
        .map(|f| CatalogEntry {
            label: label_for(f),
            format_id: f.format_id.clone(),
        })
        .collect()
}

/// Builds the catalog and substitutes a single synthetic "best available"
/// entry when nothing survives the filter, so the caller always has at
/// least one selectable row.
pub fn catalog_or_best(raw: &[FormatDescriptor], filter: FormatFilter) -> Vec<CatalogEntry> {
    let catalog = build_catalog(raw, filter);
    if catalog.is_empty() {
        vec![CatalogEntry {
            label: String::from("Safe Default"),
            format_id: String::from(BEST_FORMAT),
        }]
    } else {
        catalog
    }
}

/// The fallback subset: every independently playable descriptor, in the
/// backend's own order. The fallback picks the last element of this list.
pub fn safe_formats(raw: &[FormatDescriptor]) -> Vec<&FormatDescriptor> {
    raw.iter().filter(|f| f.is_safe()).collect()
}

fn label_for(f: &FormatDescriptor) -> String {
    let resolution = f.resolution.as_deref().unwrap_or("audio");
    let mut label = format!("{} - {}", f.format_id, resolution);
    if let Some(size) = f.filesize {
        label.push_str(&format!(" ({} MB)", format_mb(size)));
    }
    label
}

// Two-decimal rounding, printed without trailing zeros but always with at
// least one fractional digit: 10485760 -> "10.0", not "10.00".
fn format_mb(bytes: u64) -> String {
    let mb = (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0;
    let text = format!("{:.2}", mb);
    let trimmed = text.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(id: &str, resolution: Option<&str>, video: bool, audio: bool) -> FormatDescriptor {
        FormatDescriptor {
            format_id: id.to_string(),
            resolution: resolution.map(|s| s.to_string()),
            has_video: video,
            has_audio: audio,
            filesize: None,
            ext: None,
        }
    }

    fn sample() -> Vec<FormatDescriptor> {
        vec![
            desc("137", Some("1080p"), true, false),
            desc("140", None, false, true),
            FormatDescriptor {
                filesize: Some(10 * 1024 * 1024),
                ..desc("22", Some("720p"), true, true)
            },
        ]
    }

    #[test]
    fn video_only_without_audio_is_always_dropped() {
        for filter in [FormatFilter::All, FormatFilter::VideoOnly, FormatFilter::AudioOnly] {
            let catalog = build_catalog(&sample(), filter);
            assert!(
                catalog.iter().all(|e| e.format_id != "137"),
                "137 leaked through {:?}",
                filter
            );
        }
    }

    #[test]
    fn all_filter_labels_survivors() {
        let catalog = build_catalog(&sample(), FormatFilter::All);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].label, "140 - audio");
        assert_eq!(catalog[0].format_id, "140");
        assert_eq!(catalog[1].label, "22 - 720p (10.0 MB)");
        assert_eq!(catalog[1].format_id, "22");
    }

    #[test]
    fn video_only_filter_keeps_only_video() {
        let catalog = build_catalog(&sample(), FormatFilter::VideoOnly);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].format_id, "22");
    }

    #[test]
    fn audio_only_filter_keeps_only_audio() {
        let catalog = build_catalog(&sample(), FormatFilter::AudioOnly);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].format_id, "140");
    }

    #[test]
    fn empty_result_substitutes_best_available() {
        let raw = vec![desc("137", Some("1080p"), true, false)];
        let catalog = catalog_or_best(&raw, FormatFilter::AudioOnly);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].format_id, BEST_FORMAT);
    }

    #[test]
    fn non_empty_result_is_not_substituted() {
        let catalog = catalog_or_best(&sample(), FormatFilter::All);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn safe_subset_keeps_backend_order() {
        let raw = vec![
            desc("137", Some("1080p"), true, false),
            desc("18", Some("360p"), true, true),
            desc("22", Some("720p"), true, true),
        ];
        let safe = safe_formats(&raw);
        let ids: Vec<&str> = safe.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, vec!["18", "22"]);
    }

    #[test]
    fn size_label_rounds_to_two_decimals() {
        assert_eq!(format_mb(10 * 1024 * 1024), "10.0");
        assert_eq!(format_mb(10_747_904), "10.25");
        assert_eq!(format_mb(1_572_864), "1.5");
    }
}
