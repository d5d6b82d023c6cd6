// KidSchedule - local-first weekly class schedules and packing lists
// Headless entry point: boots the store and prints today's packing lists

use kidschedule::schedule::{display_name, is_book, DayOfWeek};
use kidschedule::services::ImagesService;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DATA_DIR: &str = "./kidschedule-data";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kidschedule=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    tracing::info!("Starting KidSchedule in {:?}", data_dir);

    let state = kidschedule::app::setup(data_dir).await?;

    let today = DayOfWeek::today();
    let lists = state.household.today_packing_lists().await;

    if lists.is_empty() {
        println!("No kids registered yet.");
    }

    for list in lists {
        println!(
            "{} - {} ({} classes)",
            list.kid_name, today, list.class_count
        );
        if list.items.is_empty() {
            println!("  nothing to pack");
        }
        for item in &list.items {
            let image = match state.images.resolve(item).await {
                Some(image) => image.path,
                None => format!("[{}]", ImagesService::placeholder(item)),
            };
            let kind = if is_book(item) { "book" } else { "item" };
            println!("  {} {} ({})", kind, display_name(item), image);
        }
    }

    if state.documents.is_dirty().await {
        tracing::warn!("Exiting with unsaved changes");
    }

    Ok(())
}
