//! Category lists compiled into the binary.

use super::store::{Category, ListEntry};

/// A named group of domains sharing a category.
pub struct BundledList {
    pub title: &'static str,
    pub category: Category,
    pub domains: &'static [&'static str],
}

pub const ADS: &[BundledList] = &[
    BundledList {
        title: "Google Ads",
        category: Category::Ads,
        domains: &[
            "pagead2.googlesyndication.com",
            "ads.google.com",
            "adservice.google.com",
            "pagead2.googleadservices.com",
        ],
    },
    BundledList {
        title: "Media.net",
        category: Category::Ads,
        domains: &["static.media.net", "media.net", "adservetx.media.net"],
    },
    BundledList {
        title: "Doubleclick.net",
        category: Category::Ads,
        domains: &[
            "doubleclick.net",
            "ad.doubleclick.net",
            "static.doubleclick.net",
            "m.doubleclick.net",
            "mediavisor.doubleclick.net",
        ],
    },
    BundledList {
        title: "FastClick",
        category: Category::Ads,
        domains: &[
            "fastclick.com",
            "fastclick.net",
            "media.fastclick.net",
            "cdn.fastclick.net",
        ],
    },
    BundledList {
        title: "Amazon",
        category: Category::Ads,
        domains: &[
            "adtago.s3.amazonaws.com",
            "analyticsengine.s2.amazonaws.com",
            "advice-ads.s3.amazonaws.com",
            "affiliationjs.s3.amazonaws.com",
            "advertising-api-eu.amazon.com",
            "amazonaax.com",
            "amazonclick.com",
            "assoc-amazon.com",
        ],
    },
    BundledList {
        title: "YouTube",
        category: Category::Ads,
        domains: &["ads.youtube.com"],
    },
    BundledList {
        title: "TikTok",
        category: Category::Ads,
        domains: &["ads.tiktok.com"],
    },
];

pub const ANALYTICS: &[BundledList] = &[
    BundledList {
        title: "Google Analytics",
        category: Category::Analytics,
        domains: &["google-analytics.com", "ssl.google-analytics.com"],
    },
    BundledList {
        title: "Hotjar",
        category: Category::Analytics,
        domains: &[
            "hotjar.com",
            "static.hotjar.com",
            "api-hotjar.com",
            "hotjar-analytics.com",
        ],
    },
    BundledList {
        title: "Mouseflow",
        category: Category::Analytics,
        domains: &["mouseflow.com", "a.mouseflow.com"],
    },
];

/// Block entries for every bundled list.
pub fn entries() -> Vec<ListEntry> {
    ADS.iter()
        .chain(ANALYTICS)
        .flat_map(|list| {
            list.domains
                .iter()
                .map(move |d| ListEntry::block(*d, list.category))
        })
        .collect()
}
