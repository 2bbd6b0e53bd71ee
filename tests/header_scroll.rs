mod common;

use std::time::Duration;

use common::{advance, Harness, Page};
use cover_backdrop::host::HostView;
use cover_backdrop::interpolate::{self, InterpolationChannel, Unit};
use cover_backdrop::services::FetchResponse;
use cover_backdrop::{BackdropConfig, Location, Severity};
use tokio::task::LocalSet;

const ARTIST: &str = "4Z8W4fKeB5YxbusRsdQVPb";

const ARTIST_DOC: &str = r#"{"images":[
    {"url":"https://img/640","width":640},
    {"url":"https://img/320","width":320},
    {"url":"https://img/160","width":160}
]}"#;

fn expected(h: &Harness, offset: f64, channel: &str) -> String {
    let config = h.backdrop.config();
    interpolate::compute(offset, 400.0, &config.channels, &config.scroll)
        .get(channel)
        .unwrap()
        .to_string()
}

fn style(h: &Harness, page: &Page, property: &str) -> Option<String> {
    h.view.style(page.background, property)
}

#[tokio::test(start_paused = true)]
async fn scrolling_drives_header_styles() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            let page = h.mount_page();

            h.backdrop.navigate(&Location::new("/playlist/37i9dQZF1DX4JAvHpjipBk"));
            advance(100).await;
            assert!(h.backdrop.status().header_bound);
            assert_eq!(style(&h, &page, "opacity").as_deref(), Some("1"));
            assert_eq!(style(&h, &page, "scale").as_deref(), Some("1.05"));
            assert!(!h.view.has_class(page.header, "ScrolledPast"));

            h.view.scroll_to(page.scroll, 40.0);
            assert_eq!(style(&h, &page, "opacity"), Some(expected(&h, 40.0, "opacity")));
            assert_eq!(style(&h, &page, "scale"), Some(expected(&h, 40.0, "scale")));

            h.view.scroll_to(page.scroll, 200.0);
            assert_eq!(style(&h, &page, "opacity").as_deref(), Some("0"));
            assert_eq!(style(&h, &page, "scale").as_deref(), Some("1"));
            assert!(h.view.has_class(page.header, "ScrolledPast"));

            h.view.scroll_to(page.scroll, 0.0);
            assert_eq!(style(&h, &page, "opacity").as_deref(), Some("1"));
            assert!(!h.view.has_class(page.header, "ScrolledPast"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn configured_channels_are_applied_with_units() {
    LocalSet::new()
        .run_until(async {
            let mut config = BackdropConfig::default();
            config.channels.push(
                InterpolationChannel::new("blur", "--header-blur", 0.0, 20.0)
                    .between(0.0, 50.0)
                    .with_unit(Unit::Pixels),
            );
            let h = Harness::with_config(config);
            let page = h.mount_page();

            h.backdrop.navigate(&Location::new("/album/1"));
            advance(100).await;
            assert_eq!(style(&h, &page, "--header-blur").as_deref(), Some("0px"));

            h.view.scroll_to(page.scroll, 300.0);
            assert_eq!(style(&h, &page, "--header-blur").as_deref(), Some("20px"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn navigation_keeps_a_single_listener() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            let page = h.mount_page();

            h.backdrop.navigate(&Location::new("/playlist/a"));
            advance(100).await;
            h.backdrop.navigate(&Location::new("/playlist/a"));
            advance(100).await;
            assert_eq!(h.view.listener_count(page.scroll), 1);

            h.backdrop.navigate(&Location::new("/playlist/b"));
            advance(100).await;
            assert_eq!(h.view.listener_count(page.scroll), 1);
            assert_eq!(h.view.total_listeners(), 1);
            assert_eq!(h.backdrop.status().pathname.as_deref(), Some("/playlist/b"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn navigating_away_cancels_a_half_finished_discovery() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            let scroll = h.mount_scroll_container();

            h.backdrop.navigate(&Location::new("/playlist/a"));
            advance(200).await;
            h.backdrop.navigate(&Location::new("/playlist/b"));
            advance(200).await;
            assert!(!h.backdrop.status().header_bound);

            let page = h.mount_header(scroll);
            advance(200).await;

            assert!(h.backdrop.status().header_bound);
            assert_eq!(h.view.total_listeners(), 1);
            assert_eq!(h.view.listener_count(page.scroll), 1);

            h.view.scroll_to(page.scroll, 200.0);
            assert_eq!(style(&h, &page, "opacity").as_deref(), Some("0"));
            h.view.scroll_to(page.scroll, 0.0);
            assert_eq!(style(&h, &page, "opacity").as_deref(), Some("1"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn header_markup_appearing_late_is_still_bound() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            h.backdrop.navigate(&Location::new("/playlist/a"));
            advance(1_000).await;
            assert!(!h.backdrop.status().header_bound);

            let page = h.mount_page();
            advance(100).await;
            assert!(h.backdrop.status().header_bound);
            assert_eq!(h.view.listener_count(page.scroll), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn header_discovery_gives_up_after_the_watchdog() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            h.backdrop.navigate(&Location::new("/search"));
            advance(6_000).await;

            let page = h.mount_page();
            advance(1_000).await;
            assert!(!h.backdrop.status().header_bound);
            assert_eq!(h.view.listener_count(page.scroll), 0);
            assert_eq!(style(&h, &page, "opacity"), None);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn disabling_resets_the_header_and_enabling_rebinds_it() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            let page = h.mount_page();
            h.backdrop.navigate(&Location::new("/playlist/a"));
            advance(100).await;
            h.view.scroll_to(page.scroll, 200.0);
            assert!(h.view.has_class(page.header, "ScrolledPast"));

            h.toggle.set_enabled(false);
            h.backdrop.on_toggle();
            assert_eq!(style(&h, &page, "opacity"), None);
            assert_eq!(style(&h, &page, "scale"), None);
            assert!(!h.view.has_class(page.header, "ScrolledPast"));
            assert_eq!(h.view.total_listeners(), 0);
            assert!(!h.backdrop.status().header_bound);

            h.view.scroll_to(page.scroll, 10.0);
            assert_eq!(style(&h, &page, "opacity"), None);

            h.backdrop.navigate(&Location::new("/playlist/b"));
            advance(100).await;
            assert_eq!(h.view.total_listeners(), 0);

            h.toggle.set_enabled(true);
            h.backdrop.on_toggle();
            advance(100).await;
            assert!(h.backdrop.status().header_bound);
            assert_eq!(h.view.listener_count(page.scroll), 1);
            assert_eq!(style(&h, &page, "opacity"), Some(expected(&h, 10.0, "opacity")));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn artist_pages_get_a_profile_picture() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            let page = h.mount_page();
            h.source.insert(ARTIST, FetchResponse::ok(ARTIST_DOC));

            h.backdrop.navigate(&Location::new(format!("/artist/{}", ARTIST)));
            advance(100).await;

            let children = h.view.children(page.spacing);
            assert_eq!(children.len(), 2);
            assert_eq!(children[1], page.title);
            let container = children[0];
            assert!(h.view.has_class(container, "main-entityHeader-imageContainer"));
            assert!(h.view.has_class(page.header, "ProfilePictureApplied"));

            let image = h.view.query(".main-image-image", Some(container)).expect("picture element");
            assert_eq!(h.view.tag(image).as_deref(), Some("img"));
            assert_eq!(h.view.attribute(image, "src").as_deref(), Some("https://img/320"));
            assert_eq!(h.view.attribute(image, "loading").as_deref(), Some("lazy"));

            h.backdrop.navigate(&Location::new("/playlist/a"));
            advance(100).await;
            assert!(!h.view.is_connected(container));

            h.backdrop.navigate(&Location::new(format!("/artist/{}/discography/all", ARTIST)));
            advance(100).await;
            assert_eq!(h.view.children(page.spacing).len(), 2);
            assert_eq!(h.source.calls(ARTIST), 1);
            assert!(h.notifications.shown().is_empty());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn artist_without_images_is_left_alone() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            let page = h.mount_page();
            h.source.insert(ARTIST, FetchResponse::ok(r#"{"images":[]}"#));

            h.backdrop.navigate(&Location::new(format!("/artist/{}", ARTIST)));
            advance(100).await;

            assert_eq!(h.view.children(page.spacing), vec![page.title]);
            assert!(!h.view.has_class(page.header, "ProfilePictureApplied"));
            assert!(h.notifications.shown().is_empty());
            assert!(h.backdrop.status().header_bound);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn artist_lookup_failure_is_reported() {
    LocalSet::new()
        .run_until(async {
            let h = Harness::new();
            let page = h.mount_page();
            h.source.fail(ARTIST);

            h.backdrop.navigate(&Location::new(format!("/artist/{}", ARTIST)));
            advance(100).await;

            assert_eq!(h.view.children(page.spacing), vec![page.title]);
            assert!(!h.view.has_class(page.header, "ProfilePictureApplied"));

            let shown = h.notifications.shown();
            assert_eq!(shown.len(), 1);
            let (message, severity, duration) = &shown[0];
            assert!(message.contains(ARTIST));
            assert_eq!(*severity, Severity::Error);
            assert_eq!(*duration, Duration::from_secs(5));

            // The scroll effect still works without the picture.
            h.view.scroll_to(page.scroll, 200.0);
            assert!(h.view.has_class(page.header, "ScrolledPast"));
        })
        .await;
}
