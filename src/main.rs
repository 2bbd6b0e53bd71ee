//! Headless demo: drives the backdrop against the in-memory host.

use std::{env, error::Error, path::Path, rc::Rc, time::Duration};

use cover_backdrop::host::memory::{MemoryArtistSource, MemoryCovers, MemoryDrawableFactory, MemoryView};
use cover_backdrop::host::{HostView, NodeId};
use cover_backdrop::services::FetchResponse;
use cover_backdrop::state::Selectors;
use cover_backdrop::{
    ArtistImages, Backdrop, BackdropConfig, Collaborators, HostEvent, Location, LogNotifications, NotificationSink,
    Toggle,
};
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ARTIST_ID: &str = "0OdUWJ0sBjDrqHygGUXeCF";

/// The header elements of the simulated page
struct Page {
    scroll: NodeId,
    background: NodeId,
}

/// Builds the host markup the backdrop looks for, using the first selector of
/// every fallback list.
fn mount_page(view: &MemoryView, selectors: &Selectors) -> Option<Page> {
    let app_root = view.mount(selectors.app_root.first()?, None);
    let scroll = view.mount(selectors.scroll_container.first()?, Some(app_root));
    let wrapper = view.mount(selectors.secondary_wrapper.first()?, Some(scroll));
    let background = view.mount(selectors.header_background.first()?, Some(wrapper));
    let header = view.mount(selectors.header_content.first()?, Some(wrapper));
    let spacing = view.mount(selectors.content_spacing.first()?, Some(header));
    view.mount("#header-title", Some(spacing));
    view.set_offset_height(background, 400.0);
    Some(Page { scroll, background })
}

fn notifications(desktop: bool) -> Rc<dyn NotificationSink> {
    #[cfg(feature = "desktop-notifications")]
    {
        if desktop {
            return Rc::new(cover_backdrop::notifications::DesktopNotifications::new("Cover Backdrop"));
        }
    }
    #[cfg(not(feature = "desktop-notifications"))]
    let _ = desktop;
    Rc::new(LogNotifications)
}

/// The demo flips the toggle freely, so it never touches the user's saved
/// settings.
fn demo_toggle() -> Toggle {
    Toggle::new(true)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(250)).await;
}

async fn run_demo(config: BackdropConfig, desktop: bool) -> Result<(), Box<dyn Error>> {
    let view = Rc::new(MemoryView::new());
    let page = mount_page(&view, &config.selectors).ok_or("selector lists must not be empty")?;

    let covers = Rc::new(MemoryCovers::new());
    covers.set(Some("spotify:image:ab67616d0000b273first"), 0.0);

    let source = Rc::new(MemoryArtistSource::default());
    source.insert(
        ARTIST_ID,
        FetchResponse::ok(r#"{"images":[{"url":"https://i.scdn.co/image/large"},{"url":"https://i.scdn.co/image/medium"}]}"#),
    );

    let factory = Rc::new(MemoryDrawableFactory::new(view.clone()));
    let host_view: Rc<dyn HostView> = view.clone();
    let host = Collaborators {
        view: host_view,
        drawables: factory.clone(),
        covers: covers.clone(),
        artists: Rc::new(ArtistImages::new(source)),
        notifications: notifications(desktop),
    };

    let toggle = demo_toggle();

    let backdrop = Backdrop::new(config, host, toggle.clone());
    let (tx, rx) = mpsc::unbounded_channel::<HostEvent>();
    let controller = tokio::task::spawn_local(backdrop.clone().run(
        async {},
        Location::new(format!("/artist/{}", ARTIST_ID)),
        rx,
    ));

    settle().await;
    for offset in [0.0, 40.0, 90.0, 200.0] {
        view.scroll_to(page.scroll, offset);
        info!(
            offset,
            opacity = %view.style(page.background, "opacity").unwrap_or_default(),
            scale = %view.style(page.background, "scale").unwrap_or_default(),
            "scrolled"
        );
    }
    println!("{}", serde_json::to_string_pretty(&backdrop.status())?);

    covers.set(Some("spotify:image:ab67616d0000b273second"), 42.0);
    tx.send(HostEvent::SongChanged)?;
    settle().await;

    toggle.flip();
    tx.send(HostEvent::Toggled)?;
    settle().await;
    toggle.flip();
    tx.send(HostEvent::Toggled)?;
    settle().await;

    tx.send(HostEvent::Navigated(Location::new("/playlist/37i9dQZF1DXcBWIGoYBM5M")))?;
    settle().await;
    println!("{}", serde_json::to_string_pretty(&backdrop.status())?);

    let log = factory.log();
    info!(
        created = log.created(),
        updates = log.updates(),
        destroyed = log.destroyed(),
        "drawable activity"
    );

    drop(tx);
    controller.await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cover_backdrop=info")))
        .init();

    let mut desktop = false;
    let mut config_path = None;
    for arg in env::args().skip(1) {
        if arg == "--desktop-notifications" {
            desktop = true;
        } else {
            config_path = Some(arg);
        }
    }

    let config = match config_path {
        Some(path) => BackdropConfig::load(Path::new(&path))?,
        None => BackdropConfig::default(),
    };
    config.validate()?;

    LocalSet::new().run_until(run_demo(config, desktop)).await
}
